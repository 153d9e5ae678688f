//! Package.json `exports` field evaluation.
//!
//! Implements node-compatible exports resolution for subpaths, driven
//! with the `default` condition only:
//! - exact subpath keys (`"./feature.sol"`)
//! - pattern keys with a single `*` wildcard (`"./contracts/*"`)
//! - conditions objects, where only `default` is honored
//!
//! Root-only shapes (a bare string, a `.` key, a root conditions
//! object) define no subpaths, and Solidity imports always name a
//! subpath, so they resolve to nothing here.

use serde_json::Value;

/// Resolve `subpath` (in `"./..."` form) against an `exports` value.
///
/// Returns the target path (starting with `"./"`) if the subpath is
/// exported, `None` otherwise. Exact keys win over patterns.
#[must_use]
pub fn resolve_exports(exports: &Value, subpath: &str) -> Option<String> {
    if !subpath.starts_with("./") {
        return None;
    }

    if let Some(target) = resolve_exact(exports, subpath) {
        return Some(target);
    }
    resolve_pattern(exports, subpath)
}

/// Exact subpath key lookup.
fn resolve_exact(exports: &Value, subpath: &str) -> Option<String> {
    let obj = exports.as_object()?;
    let target = obj.get(subpath)?;
    resolve_target(target)
}

/// Pattern key lookup (`"./*"`, `"./contracts/*"`).
///
/// Only one `*` per key is supported; the most specific pattern
/// (longest key) wins, lexicographic order breaking ties.
fn resolve_pattern(exports: &Value, subpath: &str) -> Option<String> {
    let obj = exports.as_object()?;

    let mut matches: Vec<(&str, &Value, String)> = Vec::new();
    for (key, value) in obj {
        if key.chars().filter(|&c| c == '*').count() != 1 {
            continue;
        }
        if !key.starts_with("./") {
            continue;
        }
        if let Some(star_value) = match_pattern(key, subpath) {
            matches.push((key.as_str(), value, star_value));
        }
    }

    if matches.is_empty() {
        return None;
    }

    matches.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let (_, target_value, star_value) = &matches[0];
    let target = resolve_target(target_value)?;
    substitute_star(&target, star_value)
}

/// Match a pattern key against a subpath, returning the `*` value.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let star_pos = pattern.find('*')?;
    let prefix = &pattern[..star_pos];
    let suffix = &pattern[star_pos + 1..];

    if !subpath.starts_with(prefix) {
        return None;
    }
    if !suffix.is_empty() && !subpath.ends_with(suffix) {
        return None;
    }

    let start = prefix.len();
    let end = subpath.len().checked_sub(suffix.len())?;
    if start > end {
        return None;
    }

    let star_value = &subpath[start..end];
    if star_value.is_empty() {
        return None;
    }
    Some(star_value.to_string())
}

/// Substitute the `*` in a pattern target, rejecting traversal.
fn substitute_star(target: &str, star_value: &str) -> Option<String> {
    if target.chars().filter(|&c| c == '*').count() != 1 {
        return None;
    }

    let result = target.replace('*', star_value);
    if !result.starts_with("./") {
        return None;
    }
    if result.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(result)
}

/// Resolve a target which can be a string or a conditions object.
fn resolve_target(target: &Value) -> Option<String> {
    if let Some(s) = target.as_str() {
        return validate_export_path(s);
    }

    // Conditions object: only the `default` condition is enabled, one
    // level of nesting like node allows.
    let conditions = target.as_object()?;
    let default = conditions.get("default")?;
    if let Some(s) = default.as_str() {
        return validate_export_path(s);
    }
    let nested = default.as_object()?;
    let inner = nested.get("default")?.as_str()?;
    validate_export_path(inner)
}

/// Node requires export targets to be `./`-relative.
fn validate_export_path(path: &str) -> Option<String> {
    if path.starts_with("./") {
        Some(path.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_subpath() {
        let exports = json!({
            ".": "./index.sol",
            "./token.sol": "./src/token.sol"
        });
        assert_eq!(
            resolve_exports(&exports, "./token.sol"),
            Some("./src/token.sol".to_string())
        );
    }

    #[test]
    fn test_exact_subpath_conditions_default_only() {
        let exports = json!({
            "./token.sol": {
                "import": "./esm/token.sol",
                "default": "./src/token.sol"
            }
        });
        assert_eq!(
            resolve_exports(&exports, "./token.sol"),
            Some("./src/token.sol".to_string())
        );
    }

    #[test]
    fn test_conditions_without_default_rejected() {
        let exports = json!({
            "./token.sol": { "import": "./esm/token.sol" }
        });
        assert_eq!(resolve_exports(&exports, "./token.sol"), None);
    }

    #[test]
    fn test_nested_default() {
        let exports = json!({
            "./token.sol": { "default": { "default": "./src/token.sol" } }
        });
        assert_eq!(
            resolve_exports(&exports, "./token.sol"),
            Some("./src/token.sol".to_string())
        );
    }

    #[test]
    fn test_pattern() {
        let exports = json!({ "./*": "./src/*" });
        assert_eq!(
            resolve_exports(&exports, "./token/T.sol"),
            Some("./src/token/T.sol".to_string())
        );
    }

    #[test]
    fn test_pattern_specificity() {
        let exports = json!({
            "./*": "./src/*",
            "./interfaces/*": "./src/ifaces/*"
        });
        assert_eq!(
            resolve_exports(&exports, "./interfaces/I.sol"),
            Some("./src/ifaces/I.sol".to_string())
        );
        assert_eq!(
            resolve_exports(&exports, "./T.sol"),
            Some("./src/T.sol".to_string())
        );
    }

    #[test]
    fn test_exact_wins_over_pattern() {
        let exports = json!({
            "./*": "./src/*",
            "./special.sol": "./other/special.sol"
        });
        assert_eq!(
            resolve_exports(&exports, "./special.sol"),
            Some("./other/special.sol".to_string())
        );
    }

    #[test]
    fn test_not_exported() {
        let exports = json!({ "./token.sol": "./src/token.sol" });
        assert_eq!(resolve_exports(&exports, "./other.sol"), None);
    }

    #[test]
    fn test_root_only_shapes_define_no_subpaths() {
        assert_eq!(
            resolve_exports(&json!("./index.sol"), "./token.sol"),
            None
        );
        assert_eq!(
            resolve_exports(&json!({ ".": "./index.sol" }), "./token.sol"),
            None
        );
        assert_eq!(
            resolve_exports(&json!({ "default": "./index.sol" }), "./token.sol"),
            None
        );
    }

    #[test]
    fn test_traversal_rejected() {
        let exports = json!({ "./*": "./*" });
        assert_eq!(resolve_exports(&exports, "./../secret.sol"), None);
    }

    #[test]
    fn test_invalid_target_rejected() {
        let exports = json!({ "./token.sol": "src/token.sol" });
        assert_eq!(resolve_exports(&exports, "./token.sol"), None);
    }
}
