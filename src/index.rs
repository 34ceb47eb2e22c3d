//! Project-wide registries built from extracted files.
//!
//! A [`ProjectIndex`] belongs to one analysis session. It is created empty,
//! filled by [`ProjectIndex::register`] in discovery order and dropped with
//! the session, so separate runs never share state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::AnalysisError;
use crate::extract::{EntryPoint, ExtractedFile};

/// Program unit registry for one project
#[derive(Debug, Default)]
pub struct ProjectIndex {
    modules: HashMap<String, PathBuf>,
    subroutines: HashMap<String, PathBuf>,
    functions: HashMap<String, PathBuf>,
    entry_point: Option<EntryPoint>,
    includes: Vec<PathBuf>,
}

/// Record `name -> file`, warning when another file already defined it.
///
/// The later definition wins, matching the order files are registered in.
fn insert_unit(map: &mut HashMap<String, PathBuf>, kind: &str, name: &str, file: &Path) {
    if let Some(previous) = map.insert(name.to_string(), file.to_path_buf()) {
        if previous != file {
            warn!(
                "{kind} `{name}` is defined in both {} and {}; using {}",
                previous.display(),
                file.display(),
                file.display()
            );
        }
    }
}

impl ProjectIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one extracted file into the index.
    ///
    /// # Errors
    /// [`AnalysisError::DuplicateEntryPoint`] when the file declares a second
    /// `program` for the project.
    pub fn register(&mut self, extracted: &ExtractedFile) -> Result<(), AnalysisError> {
        for entry in &extracted.entry_points {
            if let Some(first) = &self.entry_point {
                return Err(AnalysisError::DuplicateEntryPoint {
                    first: first.clone(),
                    second: entry.clone(),
                });
            }
            self.entry_point = Some(entry.clone());
        }

        let record = &extracted.record;
        for name in &record.modules {
            insert_unit(&mut self.modules, "module", name, &extracted.path);
        }
        for name in &record.subroutines {
            insert_unit(&mut self.subroutines, "subroutine", name, &extracted.path);
        }
        for name in &record.functions {
            insert_unit(&mut self.functions, "function", name, &extracted.path);
        }
        for path in &extracted.included_files {
            if !self.includes.contains(path) {
                self.includes.push(path.clone());
            }
        }
        Ok(())
    }

    /// File defining module `name`
    #[must_use]
    pub fn module_file(&self, name: &str) -> Option<&Path> {
        self.modules.get(name).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn subroutine_file(&self, name: &str) -> Option<&Path> {
        self.subroutines.get(name).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn function_file(&self, name: &str) -> Option<&Path> {
        self.functions.get(name).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<&EntryPoint> {
        self.entry_point.as_ref()
    }

    /// Every resolved include file, first occurrence order
    #[must_use]
    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
