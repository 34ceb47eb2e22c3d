//! Build order resolution.
//!
//! Files are scheduled by repeated passes over the pending list rather than a
//! graph traversal. A file becomes schedulable once every module it uses is
//! provided by an already scheduled file; modules provided earlier in the same
//! pass count. Passes repeat until nothing is pending, or a pass schedules
//! nothing, which means a dependency cycle or a module the project never
//! defines.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AnalysisError, PendingFile, UnsatisfiedModule};
use crate::extract::ExtractedFile;
use crate::index::ProjectIndex;

/// A valid compilation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Indices into the scheduled file list, in build order
    pub order: Vec<usize>,
    /// Modules in the order they become available
    pub modules: Vec<String>,
}

impl Schedule {
    /// Paths of the scheduled files in build order
    #[must_use]
    pub fn paths<'a>(&self, files: &'a [ExtractedFile]) -> Vec<&'a Path> {
        self.order.iter().map(|&i| files[i].path.as_path()).collect()
    }
}

/// Compute the build order of `files`, given in discovery order.
///
/// Records must already have self-dependencies removed. Ties are broken by
/// discovery order, so the result is deterministic.
///
/// # Errors
/// [`AnalysisError::UnresolvedDependencies`] listing every pending file and its
/// unsatisfied modules when a pass makes no progress.
pub fn resolve(files: &[ExtractedFile], index: &ProjectIndex) -> Result<Schedule, AnalysisError> {
    let mut available: HashSet<&str> = HashSet::new();
    let mut schedule = Schedule::default();
    let mut pending: Vec<usize> = (0..files.len()).collect();
    let mut pass = 0;

    while !pending.is_empty() {
        pass += 1;
        let before = pending.len();

        pending.retain(|&i| {
            let record = &files[i].record;
            let ready = record
                .dependencies
                .iter()
                .all(|dep| available.contains(dep.as_str()));
            if ready {
                schedule.order.push(i);
                for module in &record.modules {
                    if available.insert(module.as_str()) {
                        schedule.modules.push(module.clone());
                    }
                }
            }
            !ready
        });

        debug!(
            "scheduling pass {pass}: {} file(s) scheduled, {} pending",
            before - pending.len(),
            pending.len()
        );

        if pending.len() == before {
            return Err(AnalysisError::UnresolvedDependencies {
                pending: describe_pending(files, &pending, &available, index),
            });
        }
    }

    Ok(schedule)
}

fn describe_pending(
    files: &[ExtractedFile],
    pending: &[usize],
    available: &HashSet<&str>,
    index: &ProjectIndex,
) -> Vec<PendingFile> {
    pending
        .iter()
        .map(|&i| PendingFile {
            file: files[i].path.clone(),
            unsatisfied: files[i]
                .record
                .dependencies
                .iter()
                .filter(|dep| !available.contains(dep.as_str()))
                .map(|dep| UnsatisfiedModule {
                    name: dep.clone(),
                    defined_in: index.module_file(dep).map(PathBuf::from),
                })
                .collect(),
        })
        .collect()
}
