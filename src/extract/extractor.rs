//! Line-oriented program unit extraction
//!
//! This is deliberately not a Fortran parser. Each physical line is stripped
//! of its comment, lower-cased and split into a leading statement word and its
//! operands. A handful of structural keywords are then recognised:
//!
//! - `module` / `submodule` declarations
//! - `include` lines, which are resolved and extracted recursively
//! - `subroutine`, `function` and `program` units
//! - `use` statements, which become module dependencies
//! - `interface` blocks, whose bodies declare signatures rather than units

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::facts::{EntryPoint, ExtractedFile, FactRecord};
use crate::error::{AnalysisError, Result};
use crate::parser::{dequote, extract_element_name, is_keyword, strip_comment, QuoteError};
use crate::source::{read_lines, TextEncoding};

/// Specifiers that may precede `subroutine` or `function`
const PROCEDURE_PREFIXES: &[&str] = &[
    "recursive",
    "non_recursive",
    "pure",
    "impure",
    "elemental",
    "module",
];

/// Normalize `.` and `..` segments without touching the filesystem.
///
/// Leading `..` segments that cannot be folded are kept.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Whether `statement` starts with `keyword` as a whole name.
///
/// `use,` and `submodule(p)` qualify; `use_count` and `submodules(i)` do not.
fn opens_with(statement: &str, keyword: &str) -> bool {
    statement
        .strip_prefix(keyword)
        .is_some_and(|rest| extract_element_name(rest).is_empty())
}

/// Take the quoted operand of an `include` line, keeping its case as written.
fn include_target(code: &str) -> Option<&str> {
    let (_, operand) = code.trim().split_once(char::is_whitespace)?;
    let operand = operand.trim();
    if !operand.starts_with(['\'', '"']) {
        return None;
    }
    let target = dequote(operand);
    (!target.is_empty()).then_some(target)
}

/// Module named by a `use` statement, `None` for intrinsic modules.
///
/// `rest` is the lower-cased text following the `use` keyword, e.g.
/// ` mod_a, only: x` or `, intrinsic :: iso_c_binding`.
fn use_target(rest: &str) -> Option<&str> {
    let mut rest = rest.trim_start();
    if let Some(attrs) = rest.strip_prefix(',') {
        let (nature, after) = attrs.split_once("::")?;
        if nature.trim() == "intrinsic" {
            return None;
        }
        rest = after;
    } else if let Some(after) = rest.strip_prefix("::") {
        rest = after;
    }
    let name = extract_element_name(rest.trim_start());
    (!name.is_empty()).then_some(name)
}

/// Parent module of `submodule (parent[:ancestor]) name`.
///
/// The submodule's own name must follow the parentheses.
fn submodule_parent(line: &str) -> Option<&str> {
    let open = line.find('(')?;
    let close = open + line[open..].find(')')?;
    if extract_element_name(line[close + 1..].trim_start()).is_empty() {
        return None;
    }
    let parent = extract_element_name(line[open + 1..].trim_start());
    (!parent.is_empty()).then_some(parent)
}

/// Skip procedure prefixes such as `recursive` or `pure`.
fn strip_procedure_prefixes<'a, 'b>(tokens: &'b [&'a str]) -> &'b [&'a str] {
    let mut start = 0;
    while start + 1 < tokens.len() && PROCEDURE_PREFIXES.contains(&tokens[start]) {
        start += 1;
    }
    &tokens[start..]
}

/// Mutable state threaded through one top-level extraction and its includes
#[derive(Default)]
struct IncludeWalk {
    /// Files currently being extracted, outermost first
    stack: Vec<PathBuf>,
    entry_points: Vec<EntryPoint>,
    included_files: Vec<PathBuf>,
}

/// Extracts [`FactRecord`]s from source files.
///
/// Extraction of one file depends only on that file, the files it includes and
/// the ignore lists, so a single extractor can be shared across threads.
#[derive(Debug, Clone)]
pub struct UnitExtractor {
    root: PathBuf,
    ignore_modules: HashSet<String>,
    ignore_includes: HashSet<String>,
    encoding: TextEncoding,
}

impl UnitExtractor {
    /// Create an extractor for the project rooted at `root`.
    ///
    /// Module names are compared lower-cased; include names as written.
    #[must_use]
    pub fn new(
        root: &Path,
        ignore_modules: impl IntoIterator<Item = String>,
        ignore_includes: impl IntoIterator<Item = String>,
        encoding: TextEncoding,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            ignore_modules: ignore_modules
                .into_iter()
                .map(|m| m.to_lowercase())
                .collect(),
            ignore_includes: ignore_includes.into_iter().collect(),
            encoding,
        }
    }

    /// Read and extract a project-relative source file
    pub fn extract_file(&self, path: &Path) -> Result<ExtractedFile> {
        let lines = read_lines(&self.root.join(path), self.encoding)?;
        self.extract_lines(path, &lines)
    }

    /// Extract already-read lines of a project-relative source file
    pub fn extract_lines(&self, path: &Path, lines: &[String]) -> Result<ExtractedFile> {
        let mut walk = IncludeWalk::default();
        let mut record = self.scan(path, lines, &mut walk)?;
        record.remove_self_dependencies();

        debug!(
            "extracted {}: {} module(s), {} dependency(ies), {} include(s)",
            path.display(),
            record.modules.len(),
            record.dependencies.len(),
            record.includes.len()
        );

        Ok(ExtractedFile {
            path: path.to_path_buf(),
            record,
            entry_points: walk.entry_points,
            included_files: walk.included_files,
        })
    }

    fn scan(&self, path: &Path, lines: &[String], walk: &mut IncludeWalk) -> Result<FactRecord> {
        walk.stack.push(path.to_path_buf());
        let top_level = walk.stack.len() == 1;
        let mut record = FactRecord::default();
        let mut outside_interface = true;

        for (idx, raw) in lines.iter().enumerate() {
            let malformed = |_: QuoteError| AnalysisError::MalformedQuoting {
                file: path.to_path_buf(),
                line: idx + 1,
                text: raw.clone(),
            };

            let code = strip_comment(raw).map_err(malformed)?;
            let lowered = code.trim().to_lowercase();

            let tokens: Vec<&str> = lowered.split_whitespace().collect();
            let Some(&statement) = tokens.first() else {
                continue;
            };
            let second = tokens.get(1).map(|t| extract_element_name(t));

            if extract_element_name(statement) == "endinterface"
                || (statement == "end" && second == Some("interface"))
            {
                outside_interface = true;
                continue;
            }
            if extract_element_name(statement) == "interface"
                || (statement == "abstract" && second == Some("interface"))
            {
                outside_interface = false;
                continue;
            }

            // A bare statement with no operand cannot declare anything
            if tokens.len() < 2 || statement.starts_with("end") {
                continue;
            }

            if opens_with(statement, "submodule") {
                if let Some(parent) = submodule_parent(&lowered) {
                    if !self.ignore_modules.contains(parent) {
                        record.add_dependency(parent);
                    }
                }
                continue;
            }

            if opens_with(statement, "module") {
                match tokens[1] {
                    "procedure" => continue,
                    "subroutine" | "function" => {}
                    operand => {
                        let name = extract_element_name(operand);
                        if !name.is_empty() {
                            record.add_module(name);
                        }
                        continue;
                    }
                }
            }

            if opens_with(statement.strip_prefix('#').unwrap_or(statement), "include") {
                // Case matters: include paths live on case-sensitive filesystems
                if let Some(target) = include_target(code) {
                    self.include(path, target, idx + 1, &mut record, walk)?;
                }
                continue;
            }

            let unit = strip_procedure_prefixes(&tokens);
            let unit_statement = unit[0];

            if opens_with(unit_statement, "subroutine") {
                if outside_interface {
                    if let Some(name) = unit.get(1).map(|t| extract_element_name(t)) {
                        if !name.is_empty() {
                            record.add_subroutine(name);
                        }
                    }
                }
                continue;
            }

            if opens_with(statement, "program") {
                let name = extract_element_name(tokens[1]);
                if !name.is_empty() {
                    walk.entry_points.push(EntryPoint {
                        name: name.to_string(),
                        location: path.to_path_buf(),
                    });
                    if top_level {
                        record.entry_point = true;
                    }
                }
                continue;
            }

            if opens_with(statement, "use") {
                if let Some(module) = use_target(&lowered["use".len()..]) {
                    if !self.ignore_modules.contains(module) {
                        record.add_dependency(module);
                    }
                }
                continue;
            }

            if outside_interface
                && lowered.contains("function")
                && is_keyword(&lowered, "function", true).map_err(malformed)?
            {
                let name = tokens
                    .iter()
                    .position(|&t| t == "function")
                    .and_then(|pos| tokens.get(pos + 1))
                    .map(|t| extract_element_name(t));
                if let Some(name) = name.filter(|n| !n.is_empty()) {
                    record.add_function(name);
                }
            }
        }

        walk.stack.pop();
        Ok(record)
    }

    fn include(
        &self,
        path: &Path,
        target: &str,
        line: usize,
        record: &mut FactRecord,
        walk: &mut IncludeWalk,
    ) -> Result<()> {
        if self.ignore_includes.contains(target) {
            return Ok(());
        }

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let include_file = normalize_path(&dir.join(target));

        if walk.stack.contains(&include_file) {
            let mut chain = walk.stack.clone();
            chain.push(include_file);
            return Err(AnalysisError::CircularInclude { chain }.into());
        }

        walk.included_files.push(include_file.clone());
        record.add_include(include_file.clone());

        let lines = read_lines(&self.root.join(&include_file), self.encoding).with_context(|| {
            format!("included from {}:{line}", path.display())
        })?;
        let included = self.scan(&include_file, &lines, walk)?;
        record.merge_included(&included);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> UnitExtractor {
        UnitExtractor::new(
            Path::new("."),
            vec!["omp_lib".to_string(), "IFPORT".to_string()],
            vec!["omp_lib.h".to_string()],
            TextEncoding::Guess,
        )
    }

    fn extract(source: &str) -> ExtractedFile {
        let lines: Vec<String> = source.lines().map(ToString::to_string).collect();
        extractor()
            .extract_lines(Path::new("src/test.f90"), &lines)
            .unwrap()
    }

    #[test]
    fn test_module_and_use() {
        let file = extract(
            "module Mod_A\n  use mod_b, only: x\n  use mod_c\ncontains\nend module mod_a\n",
        );
        assert_eq!(file.record.modules, vec!["mod_a"]);
        assert_eq!(file.record.dependencies, vec!["mod_b", "mod_c"]);
    }

    #[test]
    fn test_self_dependency_removed() {
        let file = extract("module m\nend module m\nprogram p\nuse m\nend program p\n");
        assert!(file.record.dependencies.is_empty());
        assert!(file.record.entry_point);
    }

    #[test]
    fn test_module_procedure_is_not_a_module() {
        let file = extract("interface gen\n  module procedure foo\nend interface gen\n");
        assert!(file.record.modules.is_empty());
    }

    #[test]
    fn test_ignored_modules_are_not_dependencies() {
        let file = extract("use omp_lib\nuse ifport\nuse mine\n");
        assert_eq!(file.record.dependencies, vec!["mine"]);
    }

    #[test]
    fn test_intrinsic_use_is_ignored() {
        let file = extract(
            "use, intrinsic :: iso_c_binding\nuse, non_intrinsic :: my_env\nuse :: other\n",
        );
        assert_eq!(file.record.dependencies, vec!["my_env", "other"]);
    }

    #[test]
    fn test_use_requires_left_boundary() {
        let file = extract("reuse x\ncause = 1\n");
        assert!(file.record.dependencies.is_empty());
    }

    #[test]
    fn test_comment_hides_keywords() {
        let file = extract("x = 1 ! use fake_mod\n! module ghost\n");
        assert!(file.record.is_empty());
    }

    #[test]
    fn test_quoted_keyword_ignored() {
        let file = extract("print *, 'function call' \n");
        assert!(file.record.functions.is_empty());
    }

    #[test]
    fn test_subroutines_and_functions() {
        let file = extract(
            "subroutine alpha(x)\nend subroutine alpha\n\
             recursive subroutine beta\nend subroutine\n\
             integer function gamma(n) result(r)\nend function gamma\n\
             pure function delta(y)\nend function\n",
        );
        assert_eq!(file.record.subroutines, vec!["alpha", "beta"]);
        assert_eq!(file.record.functions, vec!["gamma", "delta"]);
    }

    #[test]
    fn test_interface_block_excluded() {
        let file = extract(
            "interface\n  subroutine ext(a)\n  end subroutine ext\n  real function f(x)\n  end function f\nend interface\n\
             subroutine real_one\nend subroutine real_one\n",
        );
        assert_eq!(file.record.subroutines, vec!["real_one"]);
        assert!(file.record.functions.is_empty());
    }

    #[test]
    fn test_abstract_interface_excluded() {
        let file =
            extract("abstract interface\n  subroutine cb(x)\n  end subroutine\nendinterface\n");
        assert!(file.record.subroutines.is_empty());
    }

    #[test]
    fn test_end_statements_declare_nothing() {
        let file = extract("program main\nendprogram main\nendmodule m\n");
        assert_eq!(file.entry_points.len(), 1);
        assert!(file.record.modules.is_empty());
    }

    #[test]
    fn test_program_entry_recorded() {
        let file = extract("program Main\nend program\n");
        assert!(file.record.entry_point);
        assert_eq!(
            file.entry_points,
            vec![EntryPoint {
                name: "main".to_string(),
                location: PathBuf::from("src/test.f90"),
            }]
        );
    }

    #[test]
    fn test_module_subroutine_is_a_subroutine() {
        let file = extract("module subroutine impl_a(x)\nend subroutine\n");
        assert!(file.record.modules.is_empty());
        assert_eq!(file.record.subroutines, vec!["impl_a"]);
    }

    #[test]
    fn test_submodule_requires_parent() {
        let file = extract("submodule (parent_mod:child) impl\nend submodule impl\n");
        assert!(file.record.modules.is_empty());
        assert_eq!(file.record.dependencies, vec!["parent_mod"]);
    }

    #[test]
    fn test_assignment_to_keyword_like_name() {
        let file = extract("module_count = 3\nprogram_name = 'x'\n");
        assert!(file.record.is_empty());
        assert!(file.entry_points.is_empty());
    }

    #[test]
    fn test_variables_named_after_keywords() {
        let file = extract(
            "module counters\n  integer :: use_count, include_depth, submodules(4)\n\
             contains\n  subroutine bump(i)\n    use_count = use_count + 1\n\
             include_depth = 0\n    submodules(i) = 0\n    subroutine_calls = 1\n\
             end subroutine bump\nend module counters\n",
        );
        assert_eq!(file.record.modules, vec!["counters"]);
        assert_eq!(file.record.subroutines, vec!["bump"]);
        assert!(file.record.dependencies.is_empty());
        assert!(file.record.includes.is_empty());
    }

    #[test]
    fn test_keywords_glued_to_punctuation() {
        let file = extract(
            "use,intrinsic :: iso_c_binding\nuse::mod_a, only: x\nsubmodule(parent) child\n",
        );
        assert_eq!(file.record.dependencies, vec!["mod_a", "parent"]);
    }

    #[test]
    fn test_include_needs_quoted_operand() {
        let file = extract("include = 0\n#include <system.h>\n");
        assert!(file.record.includes.is_empty());
    }

    #[test]
    fn test_unbalanced_quotes_report_line() {
        let lines = vec!["module m".to_string(), "print *, 'oops".to_string()];
        let err = extractor()
            .extract_lines(Path::new("bad.f90"), &lines)
            .unwrap_err();
        match err.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::MalformedQuoting { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ignored_include_not_followed() {
        let file = extract("include 'omp_lib.h'\n");
        assert!(file.record.includes.is_empty());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("src/sub/../inc/./defs.inc")),
            PathBuf::from("src/inc/defs.inc")
        );
        assert_eq!(normalize_path(Path::new("./a.inc")), PathBuf::from("a.inc"));
        assert_eq!(normalize_path(Path::new("../a.inc")), PathBuf::from("../a.inc"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_include_target_keeps_case() {
        assert_eq!(include_target("  include 'Defs.INC'"), Some("Defs.INC"));
        assert_eq!(include_target("#include \"config.h\""), Some("config.h"));
        assert_eq!(include_target("include"), None);
        assert_eq!(include_target("include_depth = 0"), None);
    }
}
