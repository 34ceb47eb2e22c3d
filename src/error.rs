//! Error types and result aliases for fmakefile.
//!
//! This module defines the error handling infrastructure:
//! - [`Result<T>`]: Type alias for `anyhow::Result<T>` used throughout the crate
//! - [`AnalysisError`]: Fatal conditions found while analyzing a project. They
//!   travel inside `anyhow::Error` and can be recovered with `downcast_ref`.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result as AnyhowResult;

use crate::extract::EntryPoint;

pub type Result<T> = AnyhowResult<T>;

/// A file still waiting for modules when scheduling stalls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file: PathBuf,
    /// Required modules not provided by any scheduled file
    pub unsatisfied: Vec<UnsatisfiedModule>,
}

/// One unsatisfied `use` of a pending file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedModule {
    pub name: String,
    /// File that defines the module, if the project defines it at all
    pub defined_in: Option<PathBuf>,
}

/// Fatal analysis failures. Any of these aborts the run before a Makefile is written.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("unbalanced quotes at {}:{line}: {text}", .file.display())]
    MalformedQuoting {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error(
        "found more than one entry point: program `{}` in {} and program `{}` in {}",
        .first.name,
        .first.location.display(),
        .second.name,
        .second.location.display()
    )]
    DuplicateEntryPoint {
        first: EntryPoint,
        second: EntryPoint,
    },

    #[error("empty stream(s) found:\n{}\nrename file(s) (name -> name~) to exclude them", numbered(.files))]
    EmptyStreams { files: Vec<PathBuf> },

    #[error(
        "cannot resolve dependencies, probably cross-dependence or missing modules:\n{}",
        describe_pending(.pending)
    )]
    UnresolvedDependencies { pending: Vec<PendingFile> },

    #[error("unable to decode {}: none of [{}] fits", .file.display(), .tried.join(", "))]
    UnsupportedEncoding { file: PathBuf, tried: Vec<String> },

    #[error("unknown text encoding `{label}`")]
    UnknownEncoding { label: String },

    #[error("circular include: {}", arrow_chain(.chain))]
    CircularInclude { chain: Vec<PathBuf> },
}

fn numbered(files: &[PathBuf]) -> String {
    let mut out = String::new();
    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:2}) {}", i + 1, file.display());
    }
    out
}

fn arrow_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn describe_pending(pending: &[PendingFile]) -> String {
    let mut out = String::new();
    for entry in pending {
        let _ = writeln!(out, "  {}", entry.file.display());
        for (k, module) in entry.unsatisfied.iter().enumerate() {
            let origin = match &module.defined_in {
                Some(path) => format!("defined in {}", path.display()),
                None => "not defined in project".to_string(),
            };
            let _ = writeln!(out, "    {:2}) {} ({origin})", k + 1, module.name);
        }
    }
    out.trim_end().to_string()
}
