//! File tree view model maintained by [`crate::FileTreePoller`].

use std::collections::HashSet;

use platform_host::{join_path, DirectoryEntry, EntryKind};
use serde::Serialize;

use crate::backup_path::{backup_path, is_backup_name, original_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Canonical logical path; `""` for the root.
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    pub hidden: bool,
    /// A shadow backup for this file sits next to it.
    pub has_backup: bool,
    pub expanded: bool,
    /// Last successful listing; `None` until the directory has been listed while expanded.
    pub children: Option<Vec<TreeNode>>,
    /// Shadow backups in this directory whose original file is not listed.
    pub orphaned_backups: Vec<String>,
}

impl TreeNode {
    fn directory(path: String, name: String, hidden: bool) -> Self {
        Self {
            path,
            name,
            kind: EntryKind::Directory,
            hidden,
            has_backup: false,
            expanded: false,
            children: None,
            orphaned_backups: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Children shown to the user: hidden entries (shadow backups included) are left out.
    pub fn visible_children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children
            .iter()
            .flatten()
            .filter(|child| !child.hidden)
    }

    fn find(&self, path: &str) -> Option<&TreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .filter(|child| child.is_directory() || child.path == path)
            .find_map(|child| child.find(path))
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter_mut()
            .flatten()
            .find_map(|child| child.find_mut(path))
    }

    fn collect_expanded(&self, out: &mut Vec<String>) {
        if !self.is_directory() || !self.expanded {
            return;
        }
        out.push(self.path.clone());
        for child in self.children.iter().flatten() {
            child.collect_expanded(out);
        }
    }
}

/// Directory tree rooted at the granted storage root. The root is always expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTree {
    root: TreeNode,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree {
    pub fn new() -> Self {
        let mut root = TreeNode::directory(String::new(), String::new(), false);
        root.expanded = true;
        Self { root }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        self.root.find(path)
    }

    /// Expanded directories in pre-order, root first.
    pub fn expanded_dirs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_expanded(&mut out);
        out
    }

    /// Expanded directories directly below `path`.
    pub fn expanded_children(&self, path: &str) -> Vec<String> {
        self.node(path)
            .and_then(|node| node.children.as_ref())
            .map(|children| {
                children
                    .iter()
                    .filter(|child| child.is_directory() && child.expanded)
                    .map(|child| child.path.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` when the listed file at `path` has a shadow backup next to it.
    pub fn has_pending_backup(&self, path: &str) -> bool {
        self.node(path).is_some_and(|node| node.has_backup)
    }

    /// Marks a directory expanded. Returns `false` when `path` is not a known directory.
    pub fn expand(&mut self, path: &str) -> bool {
        match self.root.find_mut(path) {
            Some(node) if node.is_directory() => {
                node.expanded = true;
                true
            }
            _ => false,
        }
    }

    /// Collapses a directory and discards its children. The root cannot be collapsed.
    pub fn collapse(&mut self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        match self.root.find_mut(path) {
            Some(node) if node.is_directory() => {
                node.expanded = false;
                node.children = None;
                node.orphaned_backups.clear();
                true
            }
            _ => false,
        }
    }

    /// Replaces the children of the expanded directory at `dir` with a fresh listing.
    ///
    /// Subdirectories that survive keep their expansion state and children. Returns `false` when
    /// `dir` is unknown or collapsed.
    pub fn apply_listing(&mut self, dir: &str, entries: Vec<DirectoryEntry>) -> bool {
        let Some(node) = self.root.find_mut(dir) else {
            return false;
        };
        if !node.is_directory() || !node.expanded {
            return false;
        }

        let names: HashSet<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        let sibling_paths: HashSet<String> = entries
            .iter()
            .map(|entry| join_path(dir, &entry.name))
            .collect();
        let mut previous = node.children.take().unwrap_or_default();

        let children = entries
            .iter()
            .map(|entry| {
                let path = join_path(dir, &entry.name);
                let reused = previous
                    .iter()
                    .position(|old| old.name == entry.name && old.kind == entry.kind)
                    .map(|index| previous.swap_remove(index));
                match (entry.kind, reused) {
                    (EntryKind::Directory, Some(old)) => TreeNode {
                        hidden: entry.hidden(),
                        ..old
                    },
                    (EntryKind::Directory, None) => {
                        TreeNode::directory(path, entry.name.clone(), entry.hidden())
                    }
                    (EntryKind::File, _) => TreeNode {
                        has_backup: sibling_paths.contains(&backup_path(&path)),
                        path,
                        name: entry.name.clone(),
                        kind: EntryKind::File,
                        hidden: entry.hidden(),
                        expanded: false,
                        children: None,
                        orphaned_backups: Vec::new(),
                    },
                }
            })
            .collect();

        node.orphaned_backups = entries
            .iter()
            .filter(|entry| entry.is_file() && is_backup_name(&entry.name))
            .filter(|entry| original_name(&entry.name).is_some_and(|name| !names.contains(name)))
            .map(|entry| join_path(dir, &entry.name))
            .collect();
        node.children = Some(children);
        true
    }
}
