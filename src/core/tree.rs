use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::classifier::PathClassifier;
use super::languages::Language;

/// Renders the surviving part of a directory hierarchy as an indented tree.
///
/// Directories come before files, each group sorted by name. A file survives
/// when it has an extractor or is important; a directory survives when
/// anything below it survives.
pub struct TreeBuilder<'a> {
    classifier: &'a PathClassifier,
}

/// A surviving entry, built bottom-up so empty directories can be pruned
#[derive(Debug)]
enum TreeNode {
    File(String),
    Dir(String, Vec<TreeNode>),
}

impl<'a> TreeBuilder<'a> {
    pub fn new(classifier: &'a PathClassifier) -> Self {
        Self { classifier }
    }

    /// Build the tree text for `root`; the first line is `<root name>/`.
    pub fn build(&self, root: &Path) -> String {
        let mut lines = vec![format!("{}/", root_name(root))];
        let children = self.collect(root, Path::new(""));
        render(&children, "", &mut lines);
        lines.join("\n")
    }

    fn collect(&self, dir: &Path, relative: &Path) -> Vec<TreeNode> {
        match sorted_entries(dir) {
            Ok(entries) => self.nodes(entries, relative),
            Err(e) => {
                debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                Vec::new()
            }
        }
    }

    /// Surviving nodes among an already listed directory's entries
    fn nodes(&self, entries: Vec<SortedEntry>, relative: &Path) -> Vec<TreeNode> {
        let mut nodes = Vec::new();
        for entry in entries {
            let name = entry.name.to_string_lossy().to_string();
            let child_relative = relative.join(&entry.name);
            if self.classifier.should_ignore(&child_relative) {
                continue;
            }

            if entry.is_dir {
                let children = self.collect(&entry.path, &child_relative);
                if !children.is_empty() {
                    nodes.push(TreeNode::Dir(name, children));
                }
            } else if Language::from_path(&entry.path).is_some()
                || self.classifier.is_important(&entry.path)
            {
                nodes.push(TreeNode::File(name));
            }
        }
        nodes
    }
}

fn render(nodes: &[TreeNode], prefix: &str, lines: &mut Vec<String>) {
    for (index, node) in nodes.iter().enumerate() {
        let last = index + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        match node {
            TreeNode::File(name) => lines.push(format!("{}{}{}", prefix, branch, name)),
            TreeNode::Dir(name, children) => {
                lines.push(format!("{}{}{}/", prefix, branch, name));
                let continuation = if last { "    " } else { "│   " };
                render(children, &format!("{}{}", prefix, continuation), lines);
            }
        }
    }
}

/// A directory entry whose file type has been resolved to a file or directory
pub(crate) struct SortedEntry {
    pub name: std::ffi::OsString,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Directory listing with directories first, then files, each by name.
/// Symbolic links and other special files are left out.
pub(crate) fn sorted_entries(dir: &Path) -> std::io::Result<Vec<SortedEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() && !file_type.is_file() {
            continue;
        }
        entries.push(SortedEntry {
            name: entry.file_name(),
            path: entry.path(),
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| dirs_first(a.is_dir, &a.name, b.is_dir, &b.name));
    Ok(entries)
}

/// Ordering shared by the tree and the scanner
pub(crate) fn dirs_first(
    a_is_dir: bool,
    a_name: &std::ffi::OsStr,
    b_is_dir: bool,
    b_name: &std::ffi::OsStr,
) -> Ordering {
    b_is_dir.cmp(&a_is_dir).then_with(|| a_name.cmp(b_name))
}

fn root_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| root.display().to_string())
}
