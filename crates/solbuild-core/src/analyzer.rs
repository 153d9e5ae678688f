//! Solidity source scanner.
//!
//! Extracts import strings and `pragma solidity` version constraints
//! from source text without full parsing. Comments and unrelated string
//! literals are skipped; no semantic analysis happens here.

use std::collections::HashSet;

/// Extracted content of a resolved source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// The file's text, verbatim.
    pub text: String,
    /// Import strings in first-appearance order, deduplicated.
    pub import_paths: Vec<String>,
    /// `pragma solidity` constraints in first-appearance order.
    pub version_pragmas: Vec<String>,
}

/// Scan Solidity text for imports and version pragmas.
#[must_use]
pub fn analyze_source(text: String) -> FileContent {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;

    let mut import_paths = Vec::new();
    let mut version_pragmas = Vec::new();
    let mut seen_imports = HashSet::new();
    let mut seen_pragmas = HashSet::new();

    while i < len {
        // Skip single-line comments
        if i + 1 < len && chars[i] == '/' && chars[i + 1] == '/' {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        // Skip block comments
        if i + 1 < len && chars[i] == '/' && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }

        // Skip string literals so `revert("import x")` never matches
        if chars[i] == '"' || chars[i] == '\'' {
            i = skip_string(&chars, i);
            continue;
        }

        if matches_keyword(&chars, i, "import") {
            i += 6;
            if let Some((path, end)) = scan_import_statement(&chars, i) {
                if !path.is_empty() && seen_imports.insert(path.clone()) {
                    import_paths.push(path);
                }
                i = end;
            }
            continue;
        }

        if matches_keyword(&chars, i, "pragma") {
            i += 6;
            if let Some((pragma, end)) = scan_pragma_statement(&chars, i) {
                if !pragma.is_empty() && seen_pragmas.insert(pragma.clone()) {
                    version_pragmas.push(pragma);
                }
                i = end;
            }
            continue;
        }

        i += 1;
    }

    FileContent {
        text,
        import_paths,
        version_pragmas,
    }
}

/// Check that `keyword` occurs at `i` on identifier boundaries.
fn matches_keyword(chars: &[char], i: usize, keyword: &str) -> bool {
    let kw: Vec<char> = keyword.chars().collect();
    if i + kw.len() > chars.len() || chars[i..i + kw.len()] != kw[..] {
        return false;
    }
    if i > 0 && is_ident_char(chars[i - 1]) {
        return false;
    }
    if let Some(&next) = chars.get(i + kw.len()) {
        if is_ident_char(next) {
            return false;
        }
    }
    true
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Scan from just past the `import` keyword to the statement's `;`,
/// capturing the first string literal.
///
/// Covers every Solidity import form: `import "p";`,
/// `import "p" as x;`, `import * as x from "p";`,
/// `import {A as B} from "p";`.
fn scan_import_statement(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    let mut path: Option<String> = None;

    while i < chars.len() {
        match chars[i] {
            ';' => return path.map(|p| (p, i + 1)),
            '"' | '\'' => {
                let quote = chars[i];
                let mut literal = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    literal.push(chars[i]);
                    i += 1;
                }
                i += 1;
                if path.is_none() {
                    path = Some(literal);
                }
            }
            _ => i += 1,
        }
    }

    None
}

/// Scan from just past the `pragma` keyword. Only `solidity` pragmas
/// are captured; `abicoder`/`experimental` pragmas are skipped.
fn scan_pragma_statement(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }

    let is_solidity = matches_keyword(chars, i, "solidity");
    if is_solidity {
        i += 8;
    }

    let constraint_start = i;
    while i < chars.len() && chars[i] != ';' {
        i += 1;
    }
    if i == chars.len() {
        return None;
    }

    if !is_solidity {
        return Some((String::new(), i + 1));
    }

    let constraint: String = chars[constraint_start..i].iter().collect();
    Some((constraint.trim().to_string(), i + 1))
}

fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    i
}
