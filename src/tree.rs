//! The in-memory namespace tree.
//!
//! One node per file, directory, or symlink, stored in a flat arena keyed by
//! identifier. Directories own their children as a `name -> identifier` map
//! and every node keeps a non-owning parent identifier used solely for path
//! computation, so the structure stays a single-rooted tree without
//! reference cycles.
//!
//! Structural invariants:
//! - every reachable node has exactly one parent, and that parent's children
//!   map contains it under its own name
//! - names are unique among a directory's immediate children
//! - identifiers are derived from `(parent identifier, name)` at creation
//!   and never change, including across rename
//! - a node's kind is fixed at creation; converting requires remove + create

use crate::error::{FsError, FsResult};
use crate::ident::{self, ROOT_IDENT};
use crate::path::{split_parent, split_path};
use std::collections::HashMap;

/// Node kind exposed in directory listings and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// Kind-specific node payload.
///
/// Only directories carry children and only symlinks carry a target, so
/// invalid combinations (a file with children) cannot be constructed.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Regular file: no children, no target.
    File,
    /// Directory owning its children by name.
    Directory { children: HashMap<String, u64> },
    /// Symbolic link carrying its target string.
    Symlink { target: String },
}

impl NodeKind {
    /// An empty directory payload.
    pub fn directory() -> Self {
        NodeKind::Directory {
            children: HashMap::new(),
        }
    }

    /// A symlink payload with the given target.
    pub fn symlink(target: impl Into<String>) -> Self {
        NodeKind::Symlink {
            target: target.into(),
        }
    }

    /// The listing-level kind of this payload.
    pub fn file_type(&self) -> FileType {
        match self {
            NodeKind::File => FileType::File,
            NodeKind::Directory { .. } => FileType::Directory,
            NodeKind::Symlink { .. } => FileType::Symlink,
        }
    }
}

/// A single entry in the namespace tree.
#[derive(Debug, Clone)]
pub struct Node {
    ident: u64,
    name: String,
    parent: Option<u64>,
    kind: NodeKind,
}

impl Node {
    /// Stable numeric identifier (the inode-equivalent).
    pub fn ident(&self) -> u64 {
        self.ident
    }

    /// The node's own segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the owning directory, `None` for the root.
    pub fn parent(&self) -> Option<u64> {
        self.parent
    }

    /// Kind-specific payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The listing-level kind.
    pub fn file_type(&self) -> FileType {
        self.kind.file_type()
    }

    /// Returns true if the node is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Symlink target, `None` for files and directories.
    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symlink { target } => Some(target),
            _ => None,
        }
    }

    fn children(&self) -> Option<&HashMap<String, u64>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }

    fn children_mut(&mut self) -> Option<&mut HashMap<String, u64>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }
}

/// Directory entry returned by [`FileTree::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Stable identifier of the child.
    pub ident: u64,
    /// Entry name (not a full path).
    pub name: String,
    /// Entry kind.
    pub kind: FileType,
}

/// Policy for inserting a child under a name that already exists.
///
/// The replace policy silently removes the displaced entry (and its
/// subtree), which keeps create idempotent under retry. The reject policy
/// fails the insert with [`FsError::AlreadyExists`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Overwrite an existing same-named entry.
    #[default]
    Replace,
    /// Fail with AlreadyExists.
    Reject,
}

/// The namespace tree: a flat arena of nodes keyed by identifier.
#[derive(Debug)]
pub struct FileTree {
    nodes: HashMap<u64, Node>,
    policy: DuplicatePolicy,
}

impl FileTree {
    /// Create a tree containing only the root directory.
    pub fn new(policy: DuplicatePolicy) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_IDENT,
            Node {
                ident: ROOT_IDENT,
                name: String::new(),
                parent: None,
                kind: NodeKind::directory(),
            },
        );
        Self { nodes, policy }
    }

    /// Identifier of the root directory.
    pub fn root(&self) -> u64 {
        ROOT_IDENT
    }

    /// Look up a node by identifier.
    pub fn node(&self, ident: u64) -> Option<&Node> {
        self.nodes.get(&ident)
    }

    /// Number of nodes currently in the arena (root included).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Single-level child lookup under a directory.
    pub fn child_by_name(&self, dir: u64, name: &str) -> Option<u64> {
        self.nodes.get(&dir)?.children()?.get(name).copied()
    }

    /// Resolve a relative path by walking from `from`, one child lookup per
    /// segment. The empty (or `.`) path resolves to `from` itself. Returns
    /// `None` the moment any segment is absent.
    pub fn resolve(&self, from: u64, path: &str) -> Option<u64> {
        let mut current = from;
        self.nodes.get(&current)?;
        for segment in split_path(path) {
            current = self.child_by_name(current, segment)?;
        }
        Some(current)
    }

    /// Compute a node's path relative to the root (the root's path is the
    /// empty string).
    pub fn path_of(&self, ident: u64) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(&ident)?;
        while let Some(parent) = current.parent {
            segments.push(current.name.as_str());
            current = self.nodes.get(&parent)?;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Insert a new node under `dirname(path)`, resolved from `from`.
    ///
    /// Fails with [`FsError::PathNotFound`] if the parent directory does not
    /// exist and [`FsError::NotADirectory`] if the resolved parent is a file
    /// or symlink. A same-named existing entry is handled per the tree's
    /// [`DuplicatePolicy`]. Returns the freshly allocated identifier.
    pub fn insert_child(&mut self, from: u64, path: &str, kind: NodeKind) -> FsResult<u64> {
        let (dir_path, name) =
            split_parent(path).ok_or_else(|| FsError::path_not_found(path))?;
        let parent = self
            .resolve(from, &dir_path)
            .ok_or_else(|| FsError::path_not_found(&dir_path))?;
        self.attach(parent, &name, kind)
    }

    /// Construct and insert a file node. See [`FileTree::insert_child`].
    pub fn create_child(&mut self, from: u64, path: &str) -> FsResult<u64> {
        self.insert_child(from, path, NodeKind::File)
    }

    /// Construct and insert a directory node. See [`FileTree::insert_child`].
    pub fn create_dir_child(&mut self, from: u64, path: &str) -> FsResult<u64> {
        self.insert_child(from, path, NodeKind::directory())
    }

    /// Construct and insert a symlink node. See [`FileTree::insert_child`].
    pub fn create_symlink_child(&mut self, from: u64, path: &str, target: &str) -> FsResult<u64> {
        self.insert_child(from, path, NodeKind::symlink(target))
    }

    /// Remove the node named by `path`, resolved from `from`.
    ///
    /// Fails with [`FsError::PathNotFound`] if the parent directory or the
    /// named child does not exist. Emptiness of a directory child is the
    /// caller's responsibility to check beforehand; the removed node's
    /// entire subtree is dropped from the arena.
    pub fn remove_child(&mut self, from: u64, path: &str) -> FsResult<()> {
        let (dir_path, name) =
            split_parent(path).ok_or_else(|| FsError::path_not_found(path))?;
        let parent = self
            .resolve(from, &dir_path)
            .ok_or_else(|| FsError::path_not_found(&dir_path))?;

        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| FsError::path_not_found(&dir_path))?;
        let children = parent_node
            .children_mut()
            .ok_or_else(|| FsError::not_a_directory(&dir_path))?;
        let removed = children
            .remove(&name)
            .ok_or_else(|| FsError::path_not_found(path))?;

        self.remove_subtree(removed);
        Ok(())
    }

    /// Move a child of `dir` named `old_name` under `new_dir` as `new_name`.
    ///
    /// This is a single arena operation: all checks run before the first
    /// mutation, then the child-index mapping moves, the node's name and
    /// parent back-reference update, and any displaced same-named entry is
    /// dropped (per the insert policy) in one step. The node's identifier is
    /// preserved — rename never reallocates.
    pub fn rename(
        &mut self,
        dir: u64,
        old_name: &str,
        new_name: &str,
        new_dir: u64,
    ) -> FsResult<u64> {
        let child = self.child_by_name(dir, old_name).ok_or_else(|| {
            FsError::TreeMutationFailed {
                operation: "rename",
                path: old_name.to_string(),
                detail: "source entry missing".to_string(),
            }
        })?;

        // Moving a directory under itself or one of its descendants would
        // cycle the parent chain and detach the subtree from the root.
        let mut ancestor = Some(new_dir);
        while let Some(ident) = ancestor {
            if ident == child {
                return Err(FsError::TreeMutationFailed {
                    operation: "rename",
                    path: old_name.to_string(),
                    detail: "destination is inside the moved subtree".to_string(),
                });
            }
            ancestor = self.nodes.get(&ident).and_then(|node| node.parent);
        }

        let target_node = self
            .nodes
            .get(&new_dir)
            .ok_or_else(|| FsError::path_not_found(new_name))?;
        let target_children = target_node
            .children()
            .ok_or_else(|| FsError::not_a_directory(new_name))?;

        let displaced = target_children.get(new_name).copied();
        if let Some(existing) = displaced {
            if existing != child && self.policy == DuplicatePolicy::Reject {
                return Err(FsError::already_exists(new_name));
            }
        }

        // All checks passed: mutate in one step with no externally
        // observable intermediate state.
        if let Some(children) = self
            .nodes
            .get_mut(&dir)
            .and_then(Node::children_mut)
        {
            children.remove(old_name);
        }
        if let Some(existing) = displaced {
            if existing != child {
                self.remove_subtree(existing);
            }
        }

        let node = self.nodes.get_mut(&child).ok_or_else(|| {
            FsError::TreeMutationFailed {
                operation: "rename",
                path: old_name.to_string(),
                detail: "source node missing from arena".to_string(),
            }
        })?;
        node.name = new_name.to_string();
        node.parent = Some(new_dir);

        if let Some(children) = self
            .nodes
            .get_mut(&new_dir)
            .and_then(Node::children_mut)
        {
            children.insert(new_name.to_string(), child);
        }

        Ok(child)
    }

    /// List a directory's immediate children. Order is not meaningful.
    pub fn list_children(&self, dir: u64) -> FsResult<Vec<DirEntry>> {
        let node = self
            .nodes
            .get(&dir)
            .ok_or_else(|| FsError::path_not_found(format!("#{}", dir)))?;
        let children = node
            .children()
            .ok_or_else(|| FsError::not_a_directory(node.name.clone()))?;

        Ok(children
            .iter()
            .filter_map(|(name, ident)| {
                let child = self.nodes.get(ident)?;
                Some(DirEntry {
                    ident: *ident,
                    name: name.clone(),
                    kind: child.file_type(),
                })
            })
            .collect())
    }

    /// Returns true if the node is a directory with no children.
    pub fn is_empty_dir(&self, ident: u64) -> bool {
        self.nodes
            .get(&ident)
            .and_then(Node::children)
            .is_some_and(HashMap::is_empty)
    }

    /// Attach a new node under an already-resolved parent directory.
    fn attach(&mut self, parent: u64, name: &str, kind: NodeKind) -> FsResult<u64> {
        let parent_node = self
            .nodes
            .get(&parent)
            .ok_or_else(|| FsError::path_not_found(name))?;
        let parent_ident = parent_node.ident;
        let children = parent_node
            .children()
            .ok_or_else(|| FsError::not_a_directory(parent_node.name.clone()))?;

        if let Some(existing) = children.get(name).copied() {
            match self.policy {
                DuplicatePolicy::Reject => return Err(FsError::already_exists(name)),
                DuplicatePolicy::Replace => self.remove_subtree(existing),
            }
        }

        let ident = ident::allocate(parent_ident, name);
        self.nodes.insert(
            ident,
            Node {
                ident,
                name: name.to_string(),
                parent: Some(parent),
                kind,
            },
        );
        if let Some(children) = self.nodes.get_mut(&parent).and_then(Node::children_mut) {
            children.insert(name.to_string(), ident);
        }

        Ok(ident)
    }

    /// Drop a node and all of its descendants from the arena.
    ///
    /// Iterative so that arbitrarily deep subtrees cannot exhaust the stack.
    fn remove_subtree(&mut self, ident: u64) {
        let mut pending = vec![ident];
        while let Some(next) = pending.pop() {
            let Some(node) = self.nodes.remove(&next) else {
                continue;
            };
            if let Some(children) = node.children() {
                pending.extend(children.values().copied());
            }
        }
    }
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> FileTree {
        FileTree::default()
    }

    #[test]
    fn test_new_tree_has_only_root() {
        let tree = tree();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.path_of(tree.root()), Some(String::new()));
        assert!(tree.is_empty_dir(tree.root()));
    }

    #[test]
    fn test_create_child_attaches_under_root() {
        let mut tree = tree();
        let root = tree.root();

        assert!(tree.child_by_name(root, "joe").is_none());
        let ident = tree.create_child(root, "joe").unwrap();
        assert_eq!(tree.child_by_name(root, "joe"), Some(ident));
        assert_eq!(tree.node(ident).unwrap().file_type(), FileType::File);
        assert_eq!(tree.node(ident).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_create_child_via_path_syntax() {
        let mut tree = tree();
        let root = tree.root();

        tree.create_dir_child(root, "joe").unwrap();
        let ident = tree.create_child(root, "joe/ali").unwrap();

        assert_eq!(tree.resolve(root, "joe/ali"), Some(ident));
        assert_eq!(tree.path_of(ident), Some("joe/ali".to_string()));
    }

    #[test]
    fn test_insert_child_fails_when_parent_missing() {
        let mut tree = tree();
        let root = tree.root();

        let err = tree.create_child(root, "missing/leaf").unwrap_err();
        assert!(matches!(err, FsError::PathNotFound(p) if p == "missing"));
    }

    #[test]
    fn test_insert_child_fails_under_file() {
        let mut tree = tree();
        let root = tree.root();

        tree.create_child(root, "plain").unwrap();
        let err = tree.create_child(root, "plain/leaf").unwrap_err();
        assert!(matches!(err, FsError::NotADirectory(_)));
    }

    #[test]
    fn test_replace_policy_overwrites_and_drops_subtree() {
        let mut tree = tree();
        let root = tree.root();

        tree.create_dir_child(root, "docs").unwrap();
        tree.create_child(root, "docs/readme").unwrap();
        let before = tree.node_count();

        // Replacing the directory drops its subtree from the arena.
        let replacement = tree.create_child(root, "docs").unwrap();
        assert_eq!(tree.child_by_name(root, "docs"), Some(replacement));
        assert_eq!(tree.node_count(), before - 1);
        assert!(tree.resolve(root, "docs/readme").is_none());
    }

    #[test]
    fn test_reject_policy_fails_duplicate_insert() {
        let mut tree = FileTree::new(DuplicatePolicy::Reject);
        let root = tree.root();

        let first = tree.create_child(root, "joe").unwrap();
        let err = tree.create_child(root, "joe").unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
        assert_eq!(tree.child_by_name(root, "joe"), Some(first));
    }

    #[test]
    fn test_remove_child_drops_node() {
        let mut tree = tree();
        let root = tree.root();

        tree.create_child(root, "jeo").unwrap();
        tree.remove_child(root, "jeo").unwrap();
        assert!(tree.child_by_name(root, "jeo").is_none());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_remove_child_fails_when_absent() {
        let mut tree = tree();
        let root = tree.root();

        let err = tree.remove_child(root, "leo").unwrap_err();
        assert!(matches!(err, FsError::PathNotFound(_)));
    }

    #[test]
    fn test_list_children_matches_inserts() {
        let mut tree = tree();
        let root = tree.root();

        tree.create_child(root, "jeo").unwrap();
        tree.create_dir_child(root, "ali").unwrap();
        tree.create_symlink_child(root, "leo", "jeo").unwrap();

        let mut entries = tree.list_children(root).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ali", "jeo", "leo"]);

        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![FileType::Directory, FileType::File, FileType::Symlink]
        );
    }

    #[test]
    fn test_path_round_trip() {
        let mut tree = tree();
        let root = tree.root();

        tree.create_dir_child(root, "a").unwrap();
        tree.create_dir_child(root, "a/b").unwrap();
        let leaf = tree.create_child(root, "a/b/c").unwrap();

        for ident in [root, leaf] {
            let path = tree.path_of(ident).unwrap();
            assert_eq!(tree.resolve(root, &path), Some(ident));
        }
    }

    #[test]
    fn test_rename_preserves_identifier() {
        let mut tree = tree();
        let root = tree.root();

        let docs = tree.create_dir_child(root, "docs").unwrap();
        let readme = tree.create_child(root, "docs/readme").unwrap();

        let renamed = tree.rename(docs, "readme", "readme2", docs).unwrap();
        assert_eq!(renamed, readme);
        assert!(tree.resolve(root, "docs/readme").is_none());
        assert_eq!(tree.resolve(root, "docs/readme2"), Some(readme));
        assert_eq!(tree.node(readme).unwrap().name(), "readme2");
    }

    #[test]
    fn test_rename_across_directories_updates_parent() {
        let mut tree = tree();
        let root = tree.root();

        let src = tree.create_dir_child(root, "src").unwrap();
        let dst = tree.create_dir_child(root, "dst").unwrap();
        let file = tree.create_child(root, "src/f").unwrap();

        tree.rename(src, "f", "g", dst).unwrap();
        assert_eq!(tree.node(file).unwrap().parent(), Some(dst));
        assert_eq!(tree.path_of(file), Some("dst/g".to_string()));
        assert_eq!(tree.resolve(root, "dst/g"), Some(file));
    }

    #[test]
    fn test_rename_missing_source_is_tree_mutation_failure() {
        let mut tree = tree();
        let root = tree.root();

        let err = tree.rename(root, "ghost", "ghost2", root).unwrap_err();
        assert!(matches!(err, FsError::TreeMutationFailed { .. }));
    }

    #[test]
    fn test_rename_replaces_existing_target() {
        let mut tree = tree();
        let root = tree.root();

        let keep = tree.create_child(root, "keep").unwrap();
        tree.create_child(root, "gone").unwrap();
        let before = tree.node_count();

        tree.rename(root, "keep", "gone", root).unwrap();
        assert_eq!(tree.child_by_name(root, "gone"), Some(keep));
        assert!(tree.child_by_name(root, "keep").is_none());
        assert_eq!(tree.node_count(), before - 1);
    }

    #[test]
    fn test_rename_onto_existing_rejected_under_strict_policy() {
        let mut tree = FileTree::new(DuplicatePolicy::Reject);
        let root = tree.root();

        tree.create_child(root, "a").unwrap();
        let b = tree.create_child(root, "b").unwrap();

        let err = tree.rename(root, "a", "b", root).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
        // Nothing moved: the failed rename left both entries in place.
        assert_eq!(tree.child_by_name(root, "b"), Some(b));
        assert!(tree.child_by_name(root, "a").is_some());
    }

    #[test]
    fn test_rename_into_own_subtree_is_refused() {
        let mut tree = tree();
        let root = tree.root();

        let a = tree.create_dir_child(root, "a").unwrap();
        let b = tree.create_dir_child(root, "a/b").unwrap();

        let err = tree.rename(root, "a", "a2", b).unwrap_err();
        assert!(matches!(
            err,
            FsError::TreeMutationFailed { operation: "rename", .. }
        ));

        // Nothing moved and the parent chain still reaches the root.
        assert_eq!(tree.child_by_name(root, "a"), Some(a));
        assert_eq!(tree.node(a).unwrap().parent(), Some(root));
        assert_eq!(tree.path_of(a), Some("a".to_string()));
        assert_eq!(tree.path_of(b), Some("a/b".to_string()));
    }

    #[test]
    fn test_rename_into_self_is_refused() {
        let mut tree = tree();
        let root = tree.root();

        let a = tree.create_dir_child(root, "a").unwrap();

        let err = tree.rename(root, "a", "a2", a).unwrap_err();
        assert!(matches!(err, FsError::TreeMutationFailed { .. }));
        assert_eq!(tree.path_of(a), Some("a".to_string()));
    }

    #[test]
    fn test_remove_very_deep_subtree() {
        let mut tree = tree();
        let root = tree.root();

        let mut parent = tree.create_dir_child(root, "top").unwrap();
        for _ in 0..50_000 {
            parent = tree.create_dir_child(parent, "d").unwrap();
        }
        assert_eq!(tree.node_count(), 50_002);

        tree.remove_child(root, "top").unwrap();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.is_empty_dir(root));
    }

    #[test]
    fn test_symlink_carries_target() {
        let mut tree = tree();
        let root = tree.root();

        let link = tree.create_symlink_child(root, "ln", "docs/readme").unwrap();
        assert_eq!(tree.node(link).unwrap().link_target(), Some("docs/readme"));
        assert_eq!(tree.node(link).unwrap().file_type(), FileType::Symlink);
    }

    #[test]
    fn test_resolve_empty_path_is_self() {
        let mut tree = tree();
        let root = tree.root();
        let docs = tree.create_dir_child(root, "docs").unwrap();

        assert_eq!(tree.resolve(root, ""), Some(root));
        assert_eq!(tree.resolve(docs, "."), Some(docs));
    }
}
