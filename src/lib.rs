//! fmakefile - Makefile generator for Fortran projects
//!
//! Scans a source tree, extracts declared program units and `use`
//! dependencies from every file, orders the files so that each module is
//! compiled before its users and writes a Makefile with that order.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]

pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod extract;
pub mod index;
pub mod parser;
pub mod project;
pub mod report;
pub mod schedule;
pub mod source;

// Re-export commonly used types
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::{BuildProfile, Config, DependencyMode, EmptyStreamPolicy, Platform};
pub use emit::{render_makefile, write_makefile, MakefileHeader};
pub use error::{AnalysisError, Result};
pub use extract::{ExtractedFile, FactRecord, UnitExtractor};
pub use index::ProjectIndex;
pub use project::{Analysis, Generated, Project};
pub use schedule::{resolve, Schedule};
