//! Filesystem helpers for resolution.
//!
//! Centralizes the pieces of filesystem behavior the resolver depends
//! on: true-case path discovery (so identifiers stay stable on
//! case-insensitive filesystems), `node_modules` detection, and the
//! walk-up to the nearest `package.json`.

use crate::error::Bug;
use std::path::{Component, Path, PathBuf};

/// Directory name that marks installed dependencies.
pub const NODE_MODULES: &str = "node_modules";

/// Outcome of a true-case lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrueCase {
    /// The path exists. `relative` carries the OS-canonical casing of
    /// every segment; `casing_differs` is set when that differs from
    /// what was requested.
    Found {
        relative: PathBuf,
        casing_differs: bool,
        is_file: bool,
    },
    /// No entry matches the requested path, even case-insensitively.
    Missing,
}

/// Discover the OS-canonical casing of `requested` under `root`.
///
/// Each segment is looked up against the code-point-sorted directory
/// listing: an exact match wins, otherwise the first ASCII
/// case-insensitive match is taken and the divergence recorded. This
/// yields identical observable behavior on case-sensitive and
/// case-insensitive filesystems.
pub fn true_case_relative(root: &Path, requested: &Path) -> Result<TrueCase, Bug> {
    let mut dir = root.to_path_buf();
    let mut relative = PathBuf::new();
    let mut casing_differs = false;

    let components: Vec<&std::ffi::OsStr> = requested
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();

    for (idx, component) in components.iter().enumerate() {
        let entries = match sorted_dir_entries(&dir) {
            Ok(entries) => entries,
            // The parent segment resolved to a file, or the directory
            // vanished between segments.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TrueCase::Missing),
            Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => {
                return Ok(TrueCase::Missing)
            }
            Err(e) => return Err(Bug::io(&dir, &e)),
        };

        let requested_name = component.to_string_lossy();
        let matched = entries
            .iter()
            .find(|name| name.as_str() == requested_name)
            .or_else(|| {
                entries
                    .iter()
                    .find(|name| name.eq_ignore_ascii_case(&requested_name))
            });

        let Some(true_name) = matched else {
            return Ok(TrueCase::Missing);
        };
        if true_name.as_str() != requested_name {
            casing_differs = true;
        }

        relative.push(true_name);
        dir.push(true_name);

        if idx + 1 == components.len() {
            let is_file = dir.is_file();
            return Ok(TrueCase::Found {
                relative,
                casing_differs,
                is_file,
            });
        }
    }

    // Empty relative path: the root itself, which is never a file.
    Ok(TrueCase::Missing)
}

/// List a directory's entry names sorted by Unicode code point.
fn sorted_dir_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Whether any segment of `path` is a `node_modules` directory.
#[must_use]
pub fn contains_node_modules(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == NODE_MODULES))
}

/// Walk up from `start` to the nearest directory containing a
/// `package.json`.
#[must_use]
pub fn nearest_package_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join("package.json").is_file() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}
