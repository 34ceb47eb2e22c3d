//! `QuoteScanner` - Iterator that tracks string-literal state over one line
//!
//! Fortran has two string delimiters, `'` and `"`. A string opened by one of
//! them is only closed by the same character, so `"it's"` is a single literal.
//! Doubled delimiters (`'don''t'`) close and immediately reopen the literal,
//! which leaves the state correct without special handling.

/// Type of string delimiter we're currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringDelimiter {
    #[default]
    None,
    Single, // '...'
    Double, // "..."
}

impl StringDelimiter {
    fn from_char(c: char) -> Self {
        match c {
            '\'' => StringDelimiter::Single,
            '"' => StringDelimiter::Double,
            _ => StringDelimiter::None,
        }
    }

    #[must_use]
    pub fn as_char(self) -> Option<char> {
        match self {
            StringDelimiter::None => None,
            StringDelimiter::Single => Some('\''),
            StringDelimiter::Double => Some('"'),
        }
    }
}

/// Classification failures for a single line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("string opened with {open} is never closed")]
    Unbalanced { open: char },
    #[error("position {position} is beyond the line (length {len})")]
    OutOfRange { position: usize, len: usize },
}

/// Iterator adapter yielding `(position, char, quoted)` triples
///
/// `quoted` reports whether a string literal was open when the scan reached
/// the character, so an opening delimiter is unquoted and a closing one is quoted.
pub struct QuoteScanner<'a> {
    chars: std::str::CharIndices<'a>,
    instring: StringDelimiter,
}

impl<'a> QuoteScanner<'a> {
    #[must_use]
    pub fn new(line: &'a str) -> Self {
        Self {
            chars: line.char_indices(),
            instring: StringDelimiter::None,
        }
    }

    /// Consume the rest of the line and fail if a literal is left open
    pub fn finish(mut self) -> Result<(), QuoteError> {
        for _ in self.by_ref() {}
        match self.instring.as_char() {
            Some(open) => Err(QuoteError::Unbalanced { open }),
            None => Ok(()),
        }
    }
}

impl Iterator for QuoteScanner<'_> {
    type Item = (usize, char, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let (pos, c) = self.chars.next()?;
        let quoted = self.instring != StringDelimiter::None;

        if c == '\'' || c == '"' {
            let delimiter = StringDelimiter::from_char(c);
            if self.instring == StringDelimiter::None {
                self.instring = delimiter;
            } else if self.instring == delimiter {
                self.instring = StringDelimiter::None;
            }
        }

        Some((pos, c, quoted))
    }
}

fn has_quotes(line: &str) -> bool {
    line.contains(['\'', '"'])
}

/// Check whether byte `position` of `line` lies inside a string literal.
///
/// The whole line is scanned first: unbalanced quoting is always an error,
/// even when the queried position precedes the offending delimiter.
pub fn is_quoted(line: &str, position: usize) -> Result<bool, QuoteError> {
    if position > line.len() {
        return Err(QuoteError::OutOfRange {
            position,
            len: line.len(),
        });
    }
    if !has_quotes(line) {
        return Ok(false);
    }

    QuoteScanner::new(line).finish()?;

    Ok(QuoteScanner::new(line)
        .find(|&(pos, _, _)| pos >= position)
        .is_some_and(|(_, _, quoted)| quoted))
}

/// Strip a trailing `!` comment from a line.
///
/// The comment starts at the first `!` outside a string literal. Quote
/// balance is required for the code part only; apostrophes inside the
/// comment text are not inspected.
pub fn strip_comment(line: &str) -> Result<&str, QuoteError> {
    let mut scanner = QuoteScanner::new(line);
    for (pos, c, quoted) in scanner.by_ref() {
        if c == '!' && !quoted {
            return Ok(&line[..pos]);
        }
    }
    scanner.finish()?;
    Ok(line)
}
