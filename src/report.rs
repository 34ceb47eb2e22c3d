//! Human-readable summaries for verbose and debug output.

use std::fmt::Write as _;
use std::path::{Component, Path};

use crate::emit::{wrap_tokens, WrapOptions};
use crate::extract::ExtractedFile;

const TREE_INDENT: &str = "   ";

/// Directory node keeping children in first-seen order
#[derive(Debug, Default)]
struct TreeNode {
    name: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn insert<'a>(&mut self, mut parts: impl Iterator<Item = &'a str>) {
        let Some(part) = parts.next() else {
            return;
        };
        let position = match self.children.iter().position(|c| c.name == part) {
            Some(position) => position,
            None => {
                self.children.push(TreeNode {
                    name: part.to_string(),
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        self.children[position].insert(parts);
    }

    fn render(&self, level: usize, out: &mut String) {
        for child in &self.children {
            if !child.children.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "{}-- {}", TREE_INDENT.repeat(level), child.name);
            child.render(level + 1, out);
        }
    }
}

/// Draw the project layout: one `-- name` line per directory or file.
///
/// Directories are preceded by a blank line so groups stand apart.
#[must_use]
pub fn directory_tree<P: AsRef<Path>>(paths: &[P]) -> String {
    let mut root = TreeNode::default();
    for path in paths {
        let parts = path.as_ref().components().filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        });
        root.insert(parts);
    }

    let mut out = String::from("Project:\n");
    root.render(1, &mut out);
    out
}

/// Debug description of the facts extracted from one file
#[must_use]
pub fn describe_file(file: &ExtractedFile) -> String {
    let record = &file.record;
    let mut out = format!("*** File [{}]", file.path.display());
    if record.is_empty() {
        out.push_str(" is empty.");
        return out;
    }
    out.push_str(" info:");

    let includes: Vec<String> = record
        .includes
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let sections: [(&str, &[String]); 5] = [
        ("modules", &record.modules),
        ("subroutines", &record.subroutines),
        ("functions", &record.functions),
        ("includes", &includes),
        ("dependencies", &record.dependencies),
    ];
    let width = sections.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, items) in sections {
        if items.is_empty() {
            continue;
        }
        let prefix = format!(">>> {key:<width$}: [");
        let options = WrapOptions {
            prefix: &prefix,
            postfix: "]",
            sep: ", ",
            end: "",
            ..WrapOptions::default()
        };
        out.push('\n');
        out.push_str(&wrap_tokens(items, &options));
    }
    if record.entry_point {
        out.push_str("\n!!! contains program entry.");
    }
    out
}
