//! Keyword recognition helpers
//!
//! Structural keywords are matched on plain text rather than a token stream:
//! a keyword counts only when it sits outside string literals and is not
//! glued to a longer identifier.

use std::sync::LazyLock;

use regex::Regex;

use super::quotes::{is_quoted, QuoteError};

/// First character that cannot appear in a Fortran name
static NAME_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Check whether `line` contains `keyword` as a free token.
///
/// Only the first occurrence of `keyword` is considered. It is a match when
/// it is not inside a string literal and the following character (if any) is
/// not alphabetic. With `left_boundary` the preceding character (if any) must
/// not be alphabetic either.
///
/// # Errors
/// Returns [`QuoteError::Unbalanced`] when the line's quoting is malformed.
pub fn is_keyword(line: &str, keyword: &str, left_boundary: bool) -> Result<bool, QuoteError> {
    let Some(pos) = line.find(keyword) else {
        return Ok(false);
    };
    let end = pos + keyword.len();

    if line[end..].chars().next().is_some_and(char::is_alphabetic) {
        return Ok(false);
    }
    if left_boundary && line[..pos].chars().next_back().is_some_and(char::is_alphabetic) {
        return Ok(false);
    }

    Ok(!is_quoted(line, pos)?)
}

/// Strip leading and trailing quote characters from a token.
///
/// Tolerant on purpose: `'a"`, `"a"` and `''a` all become `a`.
#[must_use]
pub fn dequote(token: &str) -> &str {
    token.trim_matches(['\'', '"'])
}

/// Get the name given to a program unit, e.g. `hello(world)` yields `hello`.
#[must_use]
pub fn extract_element_name(text: &str) -> &str {
    match NAME_END_RE.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}
