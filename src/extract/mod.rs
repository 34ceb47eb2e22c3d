//! Source fact extraction.
//!
//! - [`UnitExtractor`]: scans a file line by line and follows `include` lines
//! - [`FactRecord`]: declared units, dependencies and includes of one file
//! - [`ExtractedFile`]: a record plus the entry points and includes met on the way

pub mod extractor;
pub mod facts;

pub use extractor::{normalize_path, UnitExtractor};
pub use facts::{EntryPoint, ExtractedFile, FactRecord};
