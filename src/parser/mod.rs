//! Lexical classification of Fortran source lines.
//!
//! This module provides the quote-aware primitives the extractor relies on:
//! - [`QuoteScanner`]: Iterator tracking whether each character sits in a string literal
//! - [`strip_comment`]: Cuts a trailing `!` comment that is not inside a string
//! - [`is_keyword`]: Boundary-aware keyword matching outside string literals
//!
//! Unbalanced quoting is reported as [`QuoteError`] so callers can attach
//! file and line context.

pub mod keyword;
pub mod quotes;

pub use keyword::{dequote, extract_element_name, is_keyword};
pub use quotes::{is_quoted, strip_comment, QuoteError, QuoteScanner, StringDelimiter};
