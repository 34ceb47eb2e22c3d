//! Per-file fact records produced by the unit extractor
use std::path::PathBuf;

/// Push `value` unless an equal element is already present.
///
/// Records keep discovery order so generated rules are stable between runs.
fn push_unique<T: PartialEq>(items: &mut Vec<T>, value: T) {
    if !items.contains(&value) {
        items.push(value);
    }
}

/// Everything the extractor learned about one source file, includes merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactRecord {
    /// Declared modules
    pub modules: Vec<String>,
    /// Declared subroutines (interface bodies excluded)
    pub subroutines: Vec<String>,
    /// Declared functions (interface bodies excluded)
    pub functions: Vec<String>,
    /// Resolved include paths, nested includes included
    pub includes: Vec<PathBuf>,
    /// Modules required through `use`
    pub dependencies: Vec<String>,
    /// Whether the file itself declares a `program`
    pub entry_point: bool,
}

impl FactRecord {
    pub fn add_module(&mut self, name: &str) {
        push_unique(&mut self.modules, name.to_string());
    }

    pub fn add_subroutine(&mut self, name: &str) {
        push_unique(&mut self.subroutines, name.to_string());
    }

    pub fn add_function(&mut self, name: &str) {
        push_unique(&mut self.functions, name.to_string());
    }

    pub fn add_include(&mut self, path: PathBuf) {
        push_unique(&mut self.includes, path);
    }

    pub fn add_dependency(&mut self, name: &str) {
        push_unique(&mut self.dependencies, name.to_string());
    }

    /// Union every field of an included file's record except the entry flag
    pub fn merge_included(&mut self, included: &FactRecord) {
        for name in &included.modules {
            self.add_module(name);
        }
        for name in &included.subroutines {
            self.add_subroutine(name);
        }
        for name in &included.functions {
            self.add_function(name);
        }
        for path in &included.includes {
            self.add_include(path.clone());
        }
        for name in &included.dependencies {
            self.add_dependency(name);
        }
    }

    /// Drop `use` dependencies on modules this record declares itself
    pub fn remove_self_dependencies(&mut self) {
        let modules = &self.modules;
        self.dependencies.retain(|dep| !modules.contains(dep));
    }

    /// No recognized facts at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
            && self.subroutines.is_empty()
            && self.functions.is_empty()
            && self.includes.is_empty()
            && self.dependencies.is_empty()
            && !self.entry_point
    }
}

/// A `program` unit and the file declaring it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub location: PathBuf,
}

/// Result of extracting one top-level source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Project-relative path of the source file
    pub path: PathBuf,
    /// Facts with includes merged and self-dependencies removed
    pub record: FactRecord,
    /// Every `program` seen, including those inside included files
    pub entry_points: Vec<EntryPoint>,
    /// Every include resolved while extracting, in encounter order
    pub included_files: Vec<PathBuf>,
}
