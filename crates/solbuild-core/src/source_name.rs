//! Canonical source-name path utilities.
//!
//! Source names identify Solidity files independently of the host OS:
//! always `/`-separated, rooted at either `project` or
//! `npm/<name>@<version>`. These helpers convert between on-disk paths
//! and source names and never touch the filesystem.

use std::path::{Path, PathBuf};

/// Join source-name fragments with single `/` separators.
///
/// Runs of slashes inside or between fragments collapse to one; empty
/// fragments disappear. A trailing slash of the last fragment is not
/// preserved.
#[must_use]
pub fn join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        for segment in part.split('/').filter(|s| !s.is_empty()) {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(segment);
        }
    }
    out
}

/// Convert a relative filesystem path to a source-name fragment.
///
/// On hosts whose native separator differs from `/` the separator is
/// replaced. No `.`/`..` normalization happens here; callers guarantee
/// forward-only relative paths.
#[must_use]
pub fn fs_path_to_source_name(relative: &Path) -> String {
    let mut out = String::new();
    for component in relative.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}

/// Convert a source-name fragment to a relative filesystem path.
#[must_use]
pub fn source_name_to_fs_path(source_name: &str) -> PathBuf {
    source_name.split('/').filter(|s| !s.is_empty()).collect()
}

/// The directory portion of a source name, without trailing slash.
///
/// `dirname("project/a/B.sol")` is `"project/a"`; a bare segment has
/// dirname `""`.
#[must_use]
pub fn dirname(source_name: &str) -> &str {
    match source_name.rfind('/') {
        Some(idx) => &source_name[..idx],
        None => "",
    }
}

/// Apply a `./`/`../`-style relative import against a source-name
/// directory, resolving `.` and `..` segments.
///
/// Returns `None` when `..` segments climb past the root of `base_dir`,
/// which means the import escapes the package it was written in.
#[must_use]
pub fn apply_relative(base_dir: &str, relative: &str) -> Option<String> {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_collapses_separators() {
        assert_eq!(join(["project", "lib", "A.sol"]), "project/lib/A.sol");
        assert_eq!(join(["project/", "/lib//x/", "A.sol"]), "project/lib/x/A.sol");
        assert_eq!(join(["", "project", ""]), "project");
        assert_eq!(join(["npm/pkg@1.0.0", "src/T.sol"]), "npm/pkg@1.0.0/src/T.sol");
    }

    #[test]
    fn test_fs_path_round_trip() {
        let p = source_name_to_fs_path("contracts/token/ERC20.sol");
        assert_eq!(p, PathBuf::from("contracts").join("token").join("ERC20.sol"));
        assert_eq!(fs_path_to_source_name(&p), "contracts/token/ERC20.sol");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("project/a/B.sol"), "project/a");
        assert_eq!(dirname("project/B.sol"), "project");
        assert_eq!(dirname("B.sol"), "");
    }

    #[test]
    fn test_apply_relative_plain() {
        assert_eq!(
            apply_relative("project/contracts", "./A.sol"),
            Some("project/contracts/A.sol".to_string())
        );
        assert_eq!(
            apply_relative("project/contracts", "../lib/B.sol"),
            Some("project/lib/B.sol".to_string())
        );
    }

    #[test]
    fn test_apply_relative_underflow() {
        assert_eq!(apply_relative("project", "../A.sol"), None);
        assert_eq!(apply_relative("project/a", "../../../A.sol"), None);
    }

    #[test]
    fn test_apply_relative_dot_segments() {
        assert_eq!(
            apply_relative("project/a", "./b/./c/../D.sol"),
            Some("project/a/b/D.sol".to_string())
        );
    }
}
