//! In-memory directory tree.
//!
//! A [`DirectoryArena`] holds directory records indexed by id together with
//! the parent → children adjacency, so listings and flattening never go back
//! to the database per node.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::path::join_display;
use super::{Directory, File};

/// A directory with its contents, populated to a bounded depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    /// The directory record.
    #[serde(flatten)]
    pub directory: Directory,
    /// Whether `children` and `files` were loaded for this node.
    pub expanded: bool,
    /// Child directories in creation order.
    pub children: Vec<DirectoryNode>,
    /// Files directly in this directory, newest first.
    pub files: Vec<File>,
}

impl DirectoryNode {
    /// A node whose contents were not loaded.
    pub fn collapsed(directory: Directory) -> Self {
        Self {
            directory,
            expanded: false,
            children: Vec::new(),
            files: Vec::new(),
        }
    }
}

/// Directory records indexed by id.
#[derive(Debug, Default)]
pub struct DirectoryArena {
    nodes: HashMap<i64, Directory>,
    children: HashMap<i64, Vec<i64>>,
    roots: Vec<i64>,
}

impl DirectoryArena {
    /// Build an arena from any set of directory records.
    ///
    /// Records whose parent is not part of the set are neither roots nor
    /// anyone's children; they are only reachable through [`Self::assemble`].
    pub fn new(directories: impl IntoIterator<Item = Directory>) -> Self {
        let mut arena = Self::default();

        for directory in directories {
            match directory.parent_id {
                Some(parent_id) => arena
                    .children
                    .entry(parent_id)
                    .or_default()
                    .push(directory.id),
                None => arena.roots.push(directory.id),
            }
            arena.nodes.insert(directory.id, directory);
        }

        arena.roots.sort_unstable();
        for ids in arena.children.values_mut() {
            ids.sort_unstable();
        }

        arena
    }

    /// Number of directories in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child directory IDs of `id` in creation order.
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every directory reachable from the top level as `(id, display path)`,
    /// depth-first with siblings in creation order.
    pub fn flatten(&self) -> Vec<(i64, String)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::new();
        let mut stack: Vec<(i64, String)> = Vec::new();

        for &id in self.roots.iter().rev() {
            if let Some(directory) = self.nodes.get(&id) {
                stack.push((id, directory.name.clone()));
            }
        }

        while let Some((id, path)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            for &child_id in self.children_of(id).iter().rev() {
                if let Some(child) = self.nodes.get(&child_id) {
                    stack.push((child_id, join_display(&path, &child.name)));
                }
            }

            out.push((id, path));
        }

        out
    }

    /// Build the node for `id`, expanding `depth` levels below it.
    ///
    /// `files` maps directory IDs to their files; expanded directories
    /// without an entry get an empty list. Returns `None` if `id` is not in
    /// the arena.
    pub fn assemble(
        &self,
        id: i64,
        files: &HashMap<i64, Vec<File>>,
        depth: usize,
    ) -> Option<DirectoryNode> {
        let mut visited = HashSet::new();
        self.assemble_node(id, files, depth, &mut visited)
    }

    fn assemble_node(
        &self,
        id: i64,
        files: &HashMap<i64, Vec<File>>,
        depth: usize,
        visited: &mut HashSet<i64>,
    ) -> Option<DirectoryNode> {
        let directory = self.nodes.get(&id)?.clone();
        if depth == 0 || !visited.insert(id) {
            return Some(DirectoryNode::collapsed(directory));
        }

        let children = self
            .children_of(id)
            .iter()
            .filter_map(|&child_id| self.assemble_node(child_id, files, depth - 1, visited))
            .collect();

        Some(DirectoryNode {
            directory,
            expanded: true,
            children,
            files: files.get(&id).cloned().unwrap_or_default(),
        })
    }
}
