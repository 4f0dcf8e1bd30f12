//! The dual-write mediator.
//!
//! [`ShadowVolume`] is the public surface the protocol adapter calls. Each
//! mutating operation follows a fixed contract:
//!
//! - create / mkdir / link / symlink / rename:
//!   hook check → tree mutation → disk mutation
//! - remove:
//!   hook check → tree validation (existence, emptiness) → disk mutation →
//!   tree mutation, so a still-referenceable tree entry never points at an
//!   already-deleted disk path under concurrent lookups
//! - write / setattr: hook check → disk mutation (the tree holds no bytes
//!   or attributes)
//!
//! On failure at any step the operation returns immediately with an error
//! identifying the failing step; no compensating rollback of an
//! already-completed step is performed. If the tree step succeeds and the
//! disk step then fails, the two representations are left divergent — the
//! caller or hook layer owns reconciliation.

use crate::config::VolumeConfig;
use crate::error::{FsError, FsResult};
use crate::hooks::{
    CreateRequest, Hooks, LinkRequest, MkdirRequest, RemoveRequest, RenameRequest,
    SetattrRequest, SymlinkRequest, WriteRequest,
};
use crate::path;
use crate::store::DiskStore;
use crate::tree::{DirEntry, FileTree, FileType};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;
use tracing::{debug, error};

/// Snapshot of a resolved node, returned by lookups and mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Stable identifier (the inode-equivalent); survives rename.
    pub ident: u64,
    /// The node's own segment name.
    pub name: String,
    /// Node kind.
    pub kind: FileType,
    /// Path relative to the volume root.
    pub path: String,
}

/// A virtual namespace shadowing a backing directory.
///
/// Holds the in-memory tree behind a lock (concurrent operations against
/// the same tree are mutually exclusive for the duration of their tree
/// step), the hook registry, and the backing store mapping.
pub struct ShadowVolume {
    tree: RwLock<FileTree>,
    hooks: Hooks,
    store: DiskStore,
    location: PathBuf,
}

impl ShadowVolume {
    /// Create a volume over the configured origin directory.
    ///
    /// The origin is expected to exist; the volume never creates it.
    pub fn new(config: VolumeConfig, hooks: Hooks) -> Self {
        Self {
            tree: RwLock::new(FileTree::new(config.duplicate_policy())),
            hooks,
            store: DiskStore::new(config.origin()),
            location: config.location(),
        }
    }

    /// The backing directory this volume shadows.
    pub fn origin(&self) -> &Path {
        self.store.origin()
    }

    /// Where the external mount lifecycle would place the mount point.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// The backing store mapping used for disk operations.
    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    /// Resolve a path to a node snapshot.
    pub fn lookup(&self, tree_path: &str) -> FsResult<NodeInfo> {
        debug!("lookup: path={:?}", tree_path);
        let tree = self.tree.read().unwrap();
        let ident = tree
            .resolve(tree.root(), tree_path)
            .ok_or_else(|| FsError::path_not_found(tree_path))?;
        Ok(snapshot(&tree, ident))
    }

    /// Resolve a single child under a directory path.
    pub fn lookup_child(&self, dir_path: &str, name: &str) -> FsResult<NodeInfo> {
        self.lookup(&path::join(dir_path, name))
    }

    /// List a directory's immediate children. Order is not meaningful.
    pub fn readdir(&self, tree_path: &str) -> FsResult<Vec<DirEntry>> {
        debug!("readdir: path={:?}", tree_path);
        let tree = self.tree.read().unwrap();
        let ident = tree
            .resolve(tree.root(), tree_path)
            .ok_or_else(|| FsError::path_not_found(tree_path))?;
        tree.list_children(ident)
    }

    /// Return a symlink's target string.
    pub fn readlink(&self, tree_path: &str) -> FsResult<String> {
        debug!("readlink: path={:?}", tree_path);
        let tree = self.tree.read().unwrap();
        let ident = tree
            .resolve(tree.root(), tree_path)
            .ok_or_else(|| FsError::path_not_found(tree_path))?;
        tree.node(ident)
            .and_then(|node| node.link_target())
            .map(str::to_string)
            .ok_or_else(|| FsError::NotASymlink(tree_path.to_string()))
    }

    /// Create a regular file named `name` under `dir_path`.
    pub fn create(&self, dir_path: &str, name: &str, mode: u32) -> FsResult<NodeInfo> {
        debug!("create: dir={:?}, name={:?}, mode={:o}", dir_path, name, mode);
        self.hooks.check_create(&CreateRequest {
            path: dir_path,
            name,
            mode,
        })?;

        let info = {
            let mut tree = self.tree.write().unwrap();
            let dir = resolve_dir(&tree, dir_path)?;
            let ident = tree.create_child(dir, name)?;
            snapshot(&tree, ident)
        };

        if let Err(e) = self.store.touch(&info.path, mode) {
            error!("create diverged: tree holds {:?} but disk create failed: {}", info.path, e);
            return Err(e);
        }
        Ok(info)
    }

    /// Create a directory named `name` under `dir_path`.
    pub fn mkdir(&self, dir_path: &str, name: &str, mode: u32) -> FsResult<NodeInfo> {
        debug!("mkdir: dir={:?}, name={:?}, mode={:o}", dir_path, name, mode);
        self.hooks.check_mkdir(&MkdirRequest {
            path: dir_path,
            name,
            mode,
        })?;

        let info = {
            let mut tree = self.tree.write().unwrap();
            let dir = resolve_dir(&tree, dir_path)?;
            let ident = tree.create_dir_child(dir, name)?;
            snapshot(&tree, ident)
        };

        if let Err(e) = self.store.mkdir(&info.path, mode) {
            error!("mkdir diverged: tree holds {:?} but disk mkdir failed: {}", info.path, e);
            return Err(e);
        }
        Ok(info)
    }

    /// Create a symlink named `name` under `dir_path`, pointing at `target`.
    pub fn symlink(&self, dir_path: &str, name: &str, target: &str) -> FsResult<NodeInfo> {
        debug!("symlink: dir={:?}, name={:?}, target={:?}", dir_path, name, target);
        self.hooks.check_symlink(&SymlinkRequest {
            path: dir_path,
            target,
            new_name: name,
        })?;

        let info = {
            let mut tree = self.tree.write().unwrap();
            let dir = resolve_dir(&tree, dir_path)?;
            let ident = tree.create_symlink_child(dir, name, target)?;
            snapshot(&tree, ident)
        };

        if let Err(e) = self.store.symlink(target, &info.path) {
            error!("symlink diverged: tree holds {:?} but disk symlink failed: {}", info.path, e);
            return Err(e);
        }
        Ok(info)
    }

    /// Create a hard link named `new_name` under `dir_path` to the node at
    /// `old_path`.
    ///
    /// The link appears in the tree as a fresh file node with its own
    /// identifier; only the backing store shares the underlying bytes.
    pub fn link(&self, dir_path: &str, new_name: &str, old_path: &str) -> FsResult<NodeInfo> {
        debug!("link: dir={:?}, new_name={:?}, old={:?}", dir_path, new_name, old_path);
        self.hooks.check_link(&LinkRequest {
            path: dir_path,
            new_name,
            old_path,
        })?;

        let (info, old_tree_path) = {
            let mut tree = self.tree.write().unwrap();
            let old_ident = tree
                .resolve(tree.root(), old_path)
                .ok_or_else(|| FsError::path_not_found(old_path))?;
            let old_tree_path = tree
                .path_of(old_ident)
                .ok_or_else(|| FsError::path_not_found(old_path))?;
            let dir = resolve_dir(&tree, dir_path)?;
            let ident = tree.create_child(dir, new_name)?;
            (snapshot(&tree, ident), old_tree_path)
        };

        if let Err(e) = self.store.hard_link(&old_tree_path, &info.path) {
            error!("link diverged: tree holds {:?} but disk link failed: {}", info.path, e);
            return Err(e);
        }
        Ok(info)
    }

    /// Move `old_name` in `dir_path` to `new_name` in `new_dir_path`.
    ///
    /// The node's identifier is preserved across the move.
    pub fn rename(
        &self,
        dir_path: &str,
        old_name: &str,
        new_dir_path: &str,
        new_name: &str,
    ) -> FsResult<NodeInfo> {
        debug!(
            "rename: {:?} in {:?} -> {:?} in {:?}",
            old_name, dir_path, new_name, new_dir_path
        );
        self.hooks.check_rename(&RenameRequest {
            path: dir_path,
            old_name,
            new_name,
            new_dir: new_dir_path,
        })?;

        let (info, old_tree_path) = {
            let mut tree = self.tree.write().unwrap();
            let dir = resolve_dir(&tree, dir_path)?;
            let new_dir = resolve_dir(&tree, new_dir_path)?;
            // Snapshot the source path before the tree changes under it.
            let old_tree_path = path::join(&tree.path_of(dir).unwrap_or_default(), old_name);
            let ident = tree.rename(dir, old_name, new_name, new_dir)?;
            (snapshot(&tree, ident), old_tree_path)
        };

        if let Err(e) = self.store.rename(&old_tree_path, &info.path) {
            error!(
                "rename diverged: tree holds {:?} but disk rename from {:?} failed: {}",
                info.path, old_tree_path, e
            );
            return Err(e);
        }
        Ok(info)
    }

    /// Remove the node named `name` under `dir_path`.
    ///
    /// Refused with [`FsError::NotEmpty`] for non-empty directories. The
    /// disk entry is removed before the tree entry, so concurrent lookups
    /// never resolve a tree node whose backing path is already gone the
    /// other way around.
    pub fn remove(&self, dir_path: &str, name: &str) -> FsResult<()> {
        debug!("remove: dir={:?}, name={:?}", dir_path, name);
        self.hooks.check_remove(&RemoveRequest {
            path: dir_path,
            name,
        })?;

        let full_path = {
            let tree = self.tree.read().unwrap();
            let dir = resolve_dir(&tree, dir_path)?;
            let full_path = path::join(&tree.path_of(dir).unwrap_or_default(), name);
            let child = tree
                .child_by_name(dir, name)
                .ok_or_else(|| FsError::path_not_found(&full_path))?;
            let node = tree
                .node(child)
                .ok_or_else(|| FsError::path_not_found(&full_path))?;
            if node.is_dir() && !tree.is_empty_dir(child) {
                return Err(FsError::not_empty(full_path));
            }
            full_path
        };

        self.store.remove(&full_path)?;

        let mut tree = self.tree.write().unwrap();
        let dir = resolve_dir(&tree, dir_path)?;
        if let Err(e) = tree.remove_child(dir, name) {
            error!(
                "remove diverged: disk entry {:?} gone but tree removal failed: {}",
                full_path, e
            );
            return Err(e);
        }
        Ok(())
    }

    /// Change a node's permission bits and/or times on the backing store.
    ///
    /// The tree holds no attributes, so this is a hook check followed by a
    /// disk mutation only. Ownership changes are not supported.
    pub fn setattr(
        &self,
        tree_path: &str,
        mode: Option<u32>,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> FsResult<()> {
        debug!("setattr: path={:?}, mode={:?}", tree_path, mode);
        self.hooks.check_setattr(&SetattrRequest {
            path: tree_path,
            mode,
            atime,
            mtime,
        })?;

        let canonical = self.resolve_path(tree_path)?;
        if let Some(mode) = mode {
            self.store.chmod(&canonical, mode)?;
        }
        self.store.chtimes(&canonical, atime, mtime)
    }

    /// Write `data` at `offset` into the node's backing file.
    pub fn write(&self, tree_path: &str, data: &[u8], offset: u64) -> FsResult<usize> {
        debug!("write: path={:?}, offset={}, len={}", tree_path, offset, data.len());
        self.hooks.check_write(&WriteRequest {
            path: tree_path,
            data,
            offset,
        })?;

        let canonical = self.resolve_path(tree_path)?;
        self.store.write_at(&canonical, data, offset)
    }

    /// Read up to `size` bytes at `offset` from the node's backing file.
    pub fn read(&self, tree_path: &str, offset: u64, size: usize) -> FsResult<Vec<u8>> {
        debug!("read: path={:?}, offset={}, size={}", tree_path, offset, size);
        let canonical = self.resolve_path(tree_path)?;
        self.store.read_at(&canonical, offset, size)
    }

    /// Resolve a path in the tree and return its canonical form.
    fn resolve_path(&self, tree_path: &str) -> FsResult<String> {
        let tree = self.tree.read().unwrap();
        let ident = tree
            .resolve(tree.root(), tree_path)
            .ok_or_else(|| FsError::path_not_found(tree_path))?;
        tree.path_of(ident)
            .ok_or_else(|| FsError::path_not_found(tree_path))
    }
}

impl std::fmt::Debug for ShadowVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowVolume")
            .field("origin", &self.store.origin())
            .field("location", &self.location)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Resolve a directory path from the root, distinguishing the two failure
/// modes: the path does not exist, or it names a non-directory.
fn resolve_dir(tree: &FileTree, dir_path: &str) -> FsResult<u64> {
    let ident = tree
        .resolve(tree.root(), dir_path)
        .ok_or_else(|| FsError::path_not_found(dir_path))?;
    let node = tree
        .node(ident)
        .ok_or_else(|| FsError::path_not_found(dir_path))?;
    if !node.is_dir() {
        return Err(FsError::not_a_directory(dir_path));
    }
    Ok(ident)
}

fn snapshot(tree: &FileTree, ident: u64) -> NodeInfo {
    let node = tree.node(ident).expect("snapshot of a node just resolved");
    NodeInfo {
        ident,
        name: node.name().to_string(),
        kind: node.file_type(),
        path: tree.path_of(ident).unwrap_or_default(),
    }
}
