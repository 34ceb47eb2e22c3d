//! Source file reading with encoding detection.
//!
//! Legacy Fortran trees often carry comments in single-byte Cyrillic or
//! Western code pages. Unless an encoding is forced, each file is decoded with
//! the first candidate that accepts its bytes without malformed sequences.

use std::path::Path;

use anyhow::Context;
use encoding_rs::Encoding;
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// Encodings tried, in order, when none is configured
pub const ENCODING_CANDIDATES: &[&str] =
    &["utf-8", "windows-1251", "cp866", "ascii", "windows-1252"];

/// How source bytes are turned into text
#[derive(Debug, Clone, Copy)]
pub enum TextEncoding {
    /// Try [`ENCODING_CANDIDATES`] in order
    Guess,
    /// Decode strictly with one encoding
    Fixed(&'static Encoding),
    /// Decode strictly as 7-bit ASCII
    Ascii,
}

impl TextEncoding {
    /// Resolve an optional encoding label from configuration
    pub fn from_label(label: Option<&str>) -> std::result::Result<Self, AnalysisError> {
        let Some(label) = label else {
            return Ok(TextEncoding::Guess);
        };
        if is_ascii_label(label) {
            return Ok(TextEncoding::Ascii);
        }
        Encoding::for_label(label.trim().as_bytes())
            .map(TextEncoding::Fixed)
            .ok_or_else(|| AnalysisError::UnknownEncoding {
                label: label.to_string(),
            })
    }
}

/// WHATWG maps `ascii` onto windows-1252, which would accept any byte.
fn is_ascii_label(label: &str) -> bool {
    matches!(
        label.trim().to_ascii_lowercase().as_str(),
        "ascii" | "us-ascii"
    )
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let bytes = if encoding == encoding_rs::UTF_8 {
        bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
    } else {
        bytes
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
}

fn decode_ascii(bytes: &[u8]) -> Option<String> {
    if bytes.is_ascii() {
        String::from_utf8(bytes.to_vec()).ok()
    } else {
        None
    }
}

fn decode_with_label(label: &str, bytes: &[u8]) -> Option<String> {
    if is_ascii_label(label) {
        return decode_ascii(bytes);
    }
    Encoding::for_label(label.as_bytes()).and_then(|encoding| decode_strict(encoding, bytes))
}

/// Decode raw bytes of `path` into text.
pub fn decode(
    bytes: &[u8],
    encoding: TextEncoding,
    path: &Path,
) -> std::result::Result<String, AnalysisError> {
    let decoded = match encoding {
        TextEncoding::Fixed(encoding) => {
            decode_strict(encoding, bytes).ok_or_else(|| vec![encoding.name().to_string()])
        }
        TextEncoding::Ascii => decode_ascii(bytes).ok_or_else(|| vec!["ascii".to_string()]),
        TextEncoding::Guess => ENCODING_CANDIDATES
            .iter()
            .enumerate()
            .find_map(|(i, label)| {
                let text = decode_with_label(label, bytes)?;
                if i > 0 {
                    debug!("decoded {} as {label}", path.display());
                }
                Some(text)
            })
            .ok_or_else(|| ENCODING_CANDIDATES.iter().map(|s| (*s).to_string()).collect()),
    };

    decoded.map_err(|tried| AnalysisError::UnsupportedEncoding {
        file: path.to_path_buf(),
        tried,
    })
}

/// Read a source file and split it into lines without line terminators.
pub fn read_lines(path: &Path, encoding: TextEncoding) -> Result<Vec<String>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = decode(&bytes, encoding, path)?;
    Ok(text.lines().map(ToString::to_string).collect())
}
