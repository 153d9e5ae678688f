//! Installed-package model.

use crate::error::Bug;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source-name root of the project package.
pub const PROJECT_ROOT_SOURCE_NAME: &str = "project";

/// Source-name prefix of dependency packages.
pub const NPM_SOURCE_NAME_PREFIX: &str = "npm/";

/// Version sentinel for packages living in the surrounding monorepo
/// rather than under `node_modules` or the project itself.
pub const LOCAL_VERSION_SENTINEL: &str = "local";

/// An installed Solidity package.
///
/// Identity is by handle: the map hands out `Arc<Package>` and never
/// clones the record, so pointer equality is package equality.
#[derive(Debug)]
pub struct Package {
    /// Declared package name; may differ from the directory it was
    /// installed under.
    pub name: String,
    /// Declared version, or [`LOCAL_VERSION_SENTINEL`].
    pub version: String,
    /// Absolute path of the package directory.
    pub root_fs_path: PathBuf,
    /// Canonical source-name prefix: `project` or `npm/<name>@<version>`.
    pub root_source_name: String,
    /// Parsed `exports` field, when the package declares one.
    pub exports: Option<Value>,
}

impl Package {
    #[must_use]
    pub fn is_project(&self) -> bool {
        self.root_source_name == PROJECT_ROOT_SOURCE_NAME
    }

    /// Handle identity: two `Arc<Package>` are the same package iff
    /// they point at the same record.
    #[must_use]
    pub fn same(a: &Arc<Package>, b: &Arc<Package>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

/// Build the canonical source-name root of a dependency package.
#[must_use]
pub fn npm_root_source_name(name: &str, version: &str) -> String {
    format!("{NPM_SOURCE_NAME_PREFIX}{name}@{version}")
}

/// The `package.json` fields this crate reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub exports: Option<Value>,
}

/// Read and parse a `package.json`.
///
/// An unreadable or malformed manifest is an environment defect, not a
/// resolution outcome, so it surfaces on the bug channel.
pub fn read_manifest(path: &Path) -> Result<PackageManifest, Bug> {
    let text = std::fs::read_to_string(path).map_err(|e| Bug::io(path, &e))?;
    serde_json::from_str(&text)
        .map_err(|e| Bug::new(format!("malformed package.json at {}: {e}", path.display())))
}

/// Split a module string into its leading npm module name and the rest.
///
/// Grammar: `(@scope/)?name`, where both scope and name start with
/// `[a-z0-9~-]` and continue with `[a-z0-9~\-._]`. The remainder must
/// be empty or start with `/`. Returns `None` on any violation.
#[must_use]
pub fn parse_module_name(module: &str) -> Option<(&str, &str)> {
    let name_len = if let Some(after_at) = module.strip_prefix('@') {
        let scope_len = scan_name_part(after_at)?;
        let after_scope = after_at.get(scope_len..)?;
        let after_slash = after_scope.strip_prefix('/')?;
        let part_len = scan_name_part(after_slash)?;
        1 + scope_len + 1 + part_len
    } else {
        scan_name_part(module)?
    };

    let rest = &module[name_len..];
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some((&module[..name_len], rest))
}

/// Length of a scope or name part at the start of `s`.
fn scan_name_part(s: &str) -> Option<usize> {
    let first = s.chars().next()?;
    if !matches!(first, 'a'..='z' | '0'..='9' | '~' | '-') {
        return None;
    }

    let mut len = first.len_utf8();
    for c in s[len..].chars() {
        if matches!(c, 'a'..='z' | '0'..='9' | '~' | '-' | '.' | '_') {
            len += c.len_utf8();
        } else {
            break;
        }
    }
    Some(len)
}
