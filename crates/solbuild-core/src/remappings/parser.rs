//! Remapping line grammar.
//!
//! Parses one raw line of a remappings file into its three fragments.
//! The caller strips comments and blank lines and performs the
//! slash-ending validation; this module does no I/O.

/// One parsed remapping line, fragments verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRemapping {
    /// Scope the remapping applies in. Empty when the line carries no
    /// `context:` part.
    pub context: String,
    /// Import prefix to replace.
    pub prefix: String,
    /// Replacement for the prefix.
    pub target: String,
}

/// Parse `[context:]prefix=target`.
///
/// The context is everything before the first `:` that occurs strictly
/// before the first `=`. Returns `None` when `=` is absent or prefix or
/// target is empty; slash-ending rules are checked by the caller so
/// they can be reported under a distinct error kind.
#[must_use]
pub fn parse_remapping_line(line: &str) -> Option<RawRemapping> {
    let equals = line.find('=')?;
    let target = &line[equals + 1..];

    let before = &line[..equals];
    let (context, prefix) = match before.find(':') {
        Some(colon) => (&before[..colon], &before[colon + 1..]),
        None => ("", before),
    };

    if prefix.is_empty() || target.is_empty() {
        return None;
    }

    Some(RawRemapping {
        context: context.to_string(),
        prefix: prefix.to_string(),
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain() {
        assert_eq!(
            parse_remapping_line("foo/=bar/"),
            Some(RawRemapping {
                context: String::new(),
                prefix: "foo/".to_string(),
                target: "bar/".to_string(),
            })
        );
    }

    #[test]
    fn test_with_context() {
        assert_eq!(
            parse_remapping_line("context/:prefix/=target/"),
            Some(RawRemapping {
                context: "context/".to_string(),
                prefix: "prefix/".to_string(),
                target: "target/".to_string(),
            })
        );
    }

    #[test]
    fn test_colon_after_equals_is_target_text() {
        // The `:` here is part of the target, not a context separator.
        assert_eq!(
            parse_remapping_line("foo/=bar:baz/"),
            Some(RawRemapping {
                context: String::new(),
                prefix: "foo/".to_string(),
                target: "bar:baz/".to_string(),
            })
        );
    }

    #[test]
    fn test_second_equals_belongs_to_target() {
        let parsed = parse_remapping_line("a/=b=c/").unwrap();
        assert_eq!(parsed.prefix, "a/");
        assert_eq!(parsed.target, "b=c/");
    }

    #[test]
    fn test_missing_equals() {
        assert_eq!(parse_remapping_line("foo/bar/"), None);
    }

    #[test]
    fn test_empty_prefix() {
        assert_eq!(parse_remapping_line("=target/"), None);
        assert_eq!(parse_remapping_line("ctx/:=target/"), None);
    }

    #[test]
    fn test_empty_target() {
        assert_eq!(parse_remapping_line("foo/="), None);
    }

    #[test]
    fn test_empty_context_allowed() {
        let parsed = parse_remapping_line(":foo/=bar/").unwrap();
        assert_eq!(parsed.context, "");
        assert_eq!(parsed.prefix, "foo/");
    }
}
