//! Analysis session for one project directory.
//!
//! A [`Project`] collects the sources under its root, extracts them (in
//! parallel when allowed), merges the results into a fresh [`ProjectIndex`] in
//! discovery order and hands the outcome to the scheduler and emitter.

use std::path::{Path, PathBuf};

use anyhow::Context;
use glob::Pattern;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, EmptyStreamPolicy};
use crate::emit::{render_makefile, MakefileHeader};
use crate::error::{AnalysisError, Result};
use crate::extract::{ExtractedFile, UnitExtractor};
use crate::index::ProjectIndex;
use crate::report::describe_file;
use crate::schedule::{self, Schedule};
use crate::source::TextEncoding;

/// Ignore rule for project-relative paths
#[derive(Debug)]
enum IgnoreRule {
    /// Directory or file prefix, compared component-wise
    Prefix(PathBuf),
    Glob(Pattern),
}

impl IgnoreRule {
    fn parse(entry: &str) -> Self {
        let has_meta = entry.contains(['*', '?', '[']);
        match Pattern::new(entry) {
            Ok(pattern) if has_meta => Self::Glob(pattern),
            _ => Self::Prefix(PathBuf::from(entry.trim_end_matches(['/', '\\']))),
        }
    }

    fn matches(&self, relative: &Path) -> bool {
        match self {
            Self::Prefix(prefix) => relative.starts_with(prefix),
            Self::Glob(pattern) => pattern.matches_path(relative),
        }
    }
}

/// Source file extensions match on the file name suffix, case-sensitively
fn has_extension(name: &str, extensions: &[String]) -> bool {
    extensions
        .iter()
        .any(|e| !e.is_empty() && name.ends_with(e.as_str()))
}

/// Extraction results merged into one index
#[derive(Debug)]
pub struct Analysis {
    /// Extracted files in discovery order
    pub files: Vec<ExtractedFile>,
    pub index: ProjectIndex,
    /// Files without any recognized facts (only kept under the `warn` policy)
    pub empty: Vec<PathBuf>,
}

impl Analysis {
    /// Resolve the build order
    pub fn schedule(&self) -> std::result::Result<Schedule, AnalysisError> {
        schedule::resolve(&self.files, &self.index)
    }

    /// Sources followed by every include file, for the project tree
    #[must_use]
    pub fn all_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|f| f.path.clone())
            .chain(self.index.includes().iter().cloned())
            .collect()
    }
}

/// A project directory plus the configuration to analyze it with
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    #[must_use]
    pub fn new(root: &Path, config: Config) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path the Makefile is written to
    #[must_use]
    pub fn makefile_path(&self) -> PathBuf {
        self.root.join(&self.config.makefile_name)
    }

    /// Source files under the root, project-relative, sorted by name per directory.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let rules: Vec<IgnoreRule> = self
            .config
            .ignore_paths
            .iter()
            .map(|entry| IgnoreRule::parse(entry))
            .collect();

        let mut files = Vec::new();
        // max_depth prevents runaway traversal through symlink chains
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .max_depth(256)
            .sort_by_file_name()
        {
            let entry =
                entry.with_context(|| format!("failed to walk {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !has_extension(&name, &self.config.extensions) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if let Some(rule) = rules.iter().find(|r| r.matches(&relative)) {
                debug!("ignoring {} ({rule:?})", relative.display());
                continue;
            }
            files.push(relative);
        }

        debug!("collected {} source file(s)", files.len());
        Ok(files)
    }

    fn extractor(&self) -> Result<UnitExtractor> {
        let encoding = TextEncoding::from_label(self.config.encoding.as_deref())?;
        Ok(UnitExtractor::new(
            &self.root,
            self.config.ignored_modules(),
            self.config.ignored_includes(),
            encoding,
        ))
    }

    /// Extract every file and merge the results.
    ///
    /// With `parallel`, files are extracted on the rayon pool; merging always
    /// happens on the calling thread in discovery order, so diagnostics do not
    /// depend on thread timing.
    pub fn analyze(&self, files: &[PathBuf], parallel: bool) -> Result<Analysis> {
        let extractor = self.extractor()?;

        let results: Vec<Result<ExtractedFile>> = if parallel {
            files
                .par_iter()
                .map(|path| extractor.extract_file(path))
                .collect()
        } else {
            files
                .iter()
                .map(|path| extractor.extract_file(path))
                .collect()
        };

        let mut index = ProjectIndex::new();
        let mut extracted = Vec::with_capacity(results.len());
        for result in results {
            let file = result?;
            index.register(&file)?;
            debug!("{}", describe_file(&file));
            extracted.push(file);
        }

        let empty: Vec<PathBuf> = extracted
            .iter()
            .filter(|f| f.record.is_empty())
            .map(|f| f.path.clone())
            .collect();
        if !empty.is_empty() {
            match self.config.empty_streams {
                EmptyStreamPolicy::Error => {
                    return Err(AnalysisError::EmptyStreams { files: empty }.into());
                }
                EmptyStreamPolicy::Warn => {
                    for path in &empty {
                        warn!("empty stream: {}", path.display());
                    }
                }
            }
        }

        info!(
            "analyzed {} file(s), {} module(s), {} include(s)",
            extracted.len(),
            index.module_count(),
            index.includes().len()
        );

        Ok(Analysis {
            files: extracted,
            index,
            empty,
        })
    }

    /// Collect, analyze, schedule and render in one go.
    pub fn generate(&self, header: &MakefileHeader, parallel: bool) -> Result<Generated> {
        let files = self.collect_files()?;
        let analysis = self.analyze(&files, parallel)?;
        let schedule = analysis.schedule()?;
        let makefile = render_makefile(
            header,
            &self.config,
            &analysis.files,
            &schedule,
            &analysis.index,
        );
        Ok(Generated {
            analysis,
            schedule,
            makefile,
        })
    }
}

/// Output of [`Project::generate`]
#[derive(Debug)]
pub struct Generated {
    pub analysis: Analysis,
    pub schedule: Schedule,
    /// Complete Makefile text
    pub makefile: String,
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn project_with(files: &[(&str, &str)], config: Config) -> (TempDir, Project) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let project = Project::new(dir.path(), config);
        (dir, project)
    }

    #[test]
    fn test_collect_files_filters_and_sorts() {
        let (_dir, project) = project_with(
            &[
                ("b.f90", "module b\nend module b\n"),
                ("a.F90", "module a\nend module a\n"),
                ("notes.txt", "module x\n"),
                ("old.f90~", "module y\n"),
                ("sub/c.for", "module c\nend module c\n"),
            ],
            Config::default(),
        );
        let files = project.collect_files().unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a.F90"),
                PathBuf::from("b.f90"),
                PathBuf::from("sub/c.for"),
            ]
        );
    }

    #[test]
    fn test_ignore_paths_prefix_and_glob() {
        let config = Config {
            ignore_paths: vec!["legacy".to_string(), "**/*_test.f90".to_string()],
            ..Default::default()
        };
        let (_dir, project) = project_with(
            &[
                ("main.f90", "program main\nend program main\n"),
                ("legacy/old.f90", "module old\nend module old\n"),
                ("legacy_new/keep.f90", "module keep\nend module keep\n"),
                ("src/unit_test.f90", "module t\nend module t\n"),
            ],
            config,
        );
        let files = project.collect_files().unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("legacy_new/keep.f90"), PathBuf::from("main.f90")]
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (_dir, project) = project_with(
            &[
                ("a.f90", "module mod_a\nend module mod_a\n"),
                ("b.f90", "module mod_b\n  use mod_a\nend module mod_b\n"),
                ("c.f90", "program main\n  use mod_b\nend program main\n"),
            ],
            Config::default(),
        );
        let files = project.collect_files().unwrap();
        let parallel = project.analyze(&files, true).unwrap();
        let sequential = project.analyze(&files, false).unwrap();
        assert_eq!(parallel.files, sequential.files);
        assert_eq!(
            parallel.index.module_file("mod_b"),
            Some(Path::new("b.f90"))
        );
    }

    #[test]
    fn test_empty_stream_is_fatal_by_default() {
        let (_dir, project) = project_with(
            &[
                ("main.f90", "program main\nend program main\n"),
                ("stub.f90", "! nothing here\nx = 1\n"),
            ],
            Config::default(),
        );
        let files = project.collect_files().unwrap();
        let err = project.analyze(&files, false).unwrap_err();
        match err.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::EmptyStreams { files }) => {
                assert_eq!(files, &vec![PathBuf::from("stub.f90")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_warn_policy() {
        let config = Config {
            empty_streams: EmptyStreamPolicy::Warn,
            ..Default::default()
        };
        let (_dir, project) = project_with(
            &[
                ("main.f90", "program main\nend program main\n"),
                ("stub.f90", "x = 1\n"),
            ],
            config,
        );
        let files = project.collect_files().unwrap();
        let analysis = project.analyze(&files, false).unwrap();
        assert_eq!(analysis.empty, vec![PathBuf::from("stub.f90")]);
        assert_eq!(analysis.schedule().unwrap().order.len(), 2);
    }

    #[test]
    fn test_all_paths_lists_includes() {
        let (_dir, project) = project_with(
            &[
                ("main.f90", "program main\n  include 'inc/consts.inc'\nend program\n"),
                ("inc/consts.inc", "integer, parameter :: n = 3\n"),
            ],
            Config::default(),
        );
        let files = project.collect_files().unwrap();
        let analysis = project.analyze(&files, false).unwrap();
        assert_eq!(
            analysis.all_paths(),
            vec![PathBuf::from("main.f90"), PathBuf::from("inc/consts.inc")]
        );
    }
}
