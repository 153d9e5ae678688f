//! Remapping records and selection.
//!
//! A remapping rewrites an import prefix to a canonical source-name
//! prefix, optionally scoped by a context. Generated remappings
//! describe installation edges between packages; user remappings come
//! from `remappings.txt` files and are validated and rewritten by the
//! package map.

mod parser;

pub use parser::{parse_remapping_line, RawRemapping};

use crate::packages::Package;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Stable error codes for remappings-file validation.
pub mod codes {
    pub const REMAPPING_WITH_INVALID_SYNTAX: &str = "REMAPPING_WITH_INVALID_SYNTAX";
    pub const REMAPPING_TO_UNINSTALLED_PACKAGE: &str = "REMAPPING_TO_UNINSTALLED_PACKAGE";
    pub const ILLEGAL_REMAPPING_WITHOUT_SLASH_ENDINGS: &str =
        "ILLEGAL_REMAPPING_WITHOUT_SLASH_ENDINGS";
}

/// A context/prefix/target triple over canonical source names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    /// Scope: applies only to files whose source name starts with this.
    /// Empty matches everything.
    pub context: String,
    /// Import prefix to replace.
    pub prefix: String,
    /// Canonical source-name prefix substituted for the import prefix.
    pub target: String,
}

impl Remapping {
    /// Render in `context:prefix=target` form (no leading `:` when the
    /// context is empty).
    #[must_use]
    pub fn format(&self) -> String {
        if self.context.is_empty() {
            format!("{}={}", self.prefix, self.target)
        } else {
            format!("{}:{}={}", self.context, self.prefix, self.target)
        }
    }

    /// Replace this remapping's prefix at the start of `direct_import`.
    ///
    /// Callers check applicability first via [`select_remapping`].
    #[must_use]
    pub fn apply(&self, direct_import: &str) -> String {
        format!("{}{}", self.target, &direct_import[self.prefix.len()..])
    }
}

/// Reference to the npm package a user remapping's target points into.
#[derive(Debug, Clone)]
pub struct NpmRemappingTarget {
    /// Directory-level name the dependency was installed under.
    pub installation_name: String,
    /// The canonical package the target resolves into.
    pub package: Arc<Package>,
}

/// A validated, rewritten line of a `remappings.txt`.
///
/// All fragments use canonical source-name prefixes after rewriting.
/// Every fragment ends in `/`, except that `context` may be empty.
#[derive(Debug, Clone)]
pub struct UserRemapping {
    pub context: String,
    pub prefix: String,
    pub target: String,
    /// The trimmed line as it appeared in the file.
    pub original_format: String,
    /// Absolute path of the `remappings.txt` the line came from.
    pub source: PathBuf,
    /// Present iff the raw target began with `node_modules/`.
    pub target_npm_package: Option<NpmRemappingTarget>,
}

impl UserRemapping {
    /// The rewritten triple, without file provenance.
    #[must_use]
    pub fn as_remapping(&self) -> Remapping {
        Remapping {
            context: self.context.clone(),
            prefix: self.prefix.clone(),
            target: self.target.clone(),
        }
    }
}

/// A rejected `remappings.txt` line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserRemappingError {
    #[error("invalid remapping syntax `{remapping}` in {}", path.display())]
    InvalidSyntax { path: PathBuf, remapping: String },

    #[error("remapping fragments must end in `/` in `{remapping}` in {}", path.display())]
    WithoutSlashEndings { path: PathBuf, remapping: String },

    #[error("remapping `{remapping}` in {} targets uninstalled package `{installation_name}`", path.display())]
    ToUninstalledPackage {
        path: PathBuf,
        remapping: String,
        installation_name: String,
    },
}

impl UserRemappingError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSyntax { .. } => codes::REMAPPING_WITH_INVALID_SYNTAX,
            Self::WithoutSlashEndings { .. } => codes::ILLEGAL_REMAPPING_WITHOUT_SLASH_ENDINGS,
            Self::ToUninstalledPackage { .. } => codes::REMAPPING_TO_UNINSTALLED_PACKAGE,
        }
    }

    /// The `remappings.txt` the rejected line came from.
    #[must_use]
    pub fn source(&self) -> &std::path::Path {
        match self {
            Self::InvalidSyntax { path, .. }
            | Self::WithoutSlashEndings { path, .. }
            | Self::ToUninstalledPackage { path, .. } => path,
        }
    }

    /// The rejected line, trimmed.
    #[must_use]
    pub fn remapping(&self) -> &str {
        match self {
            Self::InvalidSyntax { remapping, .. }
            | Self::WithoutSlashEndings { remapping, .. }
            | Self::ToUninstalledPackage { remapping, .. } => remapping,
        }
    }
}

/// Pick the best applicable user remapping for `direct_import`.
///
/// Applicable means the context is a prefix of the importing file's
/// source name (empty context matches everything) and the prefix is a
/// prefix of the direct import. Longest context wins, then longest
/// prefix, then the most recently parsed line.
#[must_use]
pub fn select_remapping<'a>(
    remappings: &'a [Arc<UserRemapping>],
    from_source_name: &str,
    direct_import: &str,
) -> Option<&'a Arc<UserRemapping>> {
    let mut best: Option<&Arc<UserRemapping>> = None;

    for candidate in remappings {
        if !from_source_name.starts_with(&candidate.context) {
            continue;
        }
        if !direct_import.starts_with(&candidate.prefix) {
            continue;
        }

        // Later entries win ties, so `>=` on equal keys.
        let better = match best {
            None => true,
            Some(current) => {
                (candidate.context.len(), candidate.prefix.len())
                    >= (current.context.len(), current.prefix.len())
            }
        };
        if better {
            best = Some(candidate);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(context: &str, prefix: &str, target: &str) -> Arc<UserRemapping> {
        Arc::new(UserRemapping {
            context: context.to_string(),
            prefix: prefix.to_string(),
            target: target.to_string(),
            original_format: format!("{context}:{prefix}={target}"),
            source: PathBuf::from("/p/remappings.txt"),
            target_npm_package: None,
        })
    }

    #[test]
    fn test_apply() {
        let r = Remapping {
            context: "project/".to_string(),
            prefix: "lib/".to_string(),
            target: "npm/dep@1.0.0/src/".to_string(),
        };
        assert_eq!(r.apply("lib/Token.sol"), "npm/dep@1.0.0/src/Token.sol");
    }

    #[test]
    fn test_format() {
        let r = Remapping {
            context: String::new(),
            prefix: "a/".to_string(),
            target: "b/".to_string(),
        };
        assert_eq!(r.format(), "a/=b/");

        let r = Remapping {
            context: "project/".to_string(),
            prefix: "a/".to_string(),
            target: "b/".to_string(),
        };
        assert_eq!(r.format(), "project/:a/=b/");
    }

    #[test]
    fn test_select_longest_context_wins() {
        let remappings = vec![
            user("project/", "lib/", "project/a/"),
            user("project/contracts/", "lib/", "project/b/"),
        ];
        let best = select_remapping(&remappings, "project/contracts/C.sol", "lib/X.sol").unwrap();
        assert_eq!(best.target, "project/b/");
    }

    #[test]
    fn test_select_longest_prefix_breaks_ties() {
        let remappings = vec![
            user("project/", "lib/", "project/a/"),
            user("project/", "lib/token/", "project/b/"),
        ];
        let best = select_remapping(&remappings, "project/C.sol", "lib/token/T.sol").unwrap();
        assert_eq!(best.target, "project/b/");
    }

    #[test]
    fn test_select_latest_breaks_remaining_ties() {
        let remappings = vec![
            user("project/", "lib/", "project/first/"),
            user("project/", "lib/", "project/second/"),
        ];
        let best = select_remapping(&remappings, "project/C.sol", "lib/X.sol").unwrap();
        assert_eq!(best.target, "project/second/");
    }

    #[test]
    fn test_select_context_must_match() {
        let remappings = vec![user("npm/dep@1.0.0/", "lib/", "project/a/")];
        assert!(select_remapping(&remappings, "project/C.sol", "lib/X.sol").is_none());
    }

    #[test]
    fn test_select_empty_context_matches_everything() {
        let remappings = vec![user("", "lib/", "project/a/")];
        assert!(select_remapping(&remappings, "npm/x@1.0.0/C.sol", "lib/X.sol").is_some());
    }
}
