//! Disk operations against the backing directory.
//!
//! Every node path in the tree maps onto the backing store through a fixed
//! prefix-join rule: tree path `p` lands at `<origin>/p`. All disk
//! operations are issued against that mapped path, never against the tree
//! path directly. The store performs no retries and no rollback; each
//! failure is wrapped once with the operation name and mapped path.

use crate::error::{FsError, FsResult};
use std::ffi::CString;
use std::fs::{self, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// The real on-disk directory tree the namespace mirrors.
#[derive(Debug, Clone)]
pub struct DiskStore {
    origin: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at the given origin directory.
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    /// The backing directory all tree paths map into.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Map a tree path to its backing path. The root (empty path) maps to
    /// the origin directory itself.
    pub fn realify(&self, tree_path: &str) -> PathBuf {
        if tree_path.is_empty() {
            self.origin.clone()
        } else {
            self.origin.join(tree_path)
        }
    }

    /// Create an empty regular file with the given mode.
    pub fn touch(&self, tree_path: &str, mode: u32) -> FsResult<()> {
        let real = self.realify(tree_path);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(mode)
            .open(&real)
            .map(|_| ())
            .map_err(|e| FsError::backing_store("create", real, e))
    }

    /// Create a directory with the given mode.
    pub fn mkdir(&self, tree_path: &str, mode: u32) -> FsResult<()> {
        let real = self.realify(tree_path);
        fs::DirBuilder::new()
            .mode(mode)
            .create(&real)
            .map_err(|e| FsError::backing_store("mkdir", real, e))
    }

    /// Remove a file, symlink, or empty directory.
    pub fn remove(&self, tree_path: &str) -> FsResult<()> {
        let real = self.realify(tree_path);
        let meta = fs::symlink_metadata(&real)
            .map_err(|e| FsError::backing_store("remove", real.clone(), e))?;
        let result = if meta.is_dir() {
            fs::remove_dir(&real)
        } else {
            fs::remove_file(&real)
        };
        result.map_err(|e| FsError::backing_store("remove", real, e))
    }

    /// Rename a node from one tree path to another.
    pub fn rename(&self, old_tree_path: &str, new_tree_path: &str) -> FsResult<()> {
        let old_real = self.realify(old_tree_path);
        let new_real = self.realify(new_tree_path);
        fs::rename(&old_real, &new_real)
            .map_err(|e| FsError::backing_store("rename", old_real, e))
    }

    /// Create a hard link at `new_tree_path` to the node at `old_tree_path`.
    pub fn hard_link(&self, old_tree_path: &str, new_tree_path: &str) -> FsResult<()> {
        let old_real = self.realify(old_tree_path);
        let new_real = self.realify(new_tree_path);
        fs::hard_link(&old_real, &new_real)
            .map_err(|e| FsError::backing_store("link", new_real, e))
    }

    /// Create a symlink at `tree_path` pointing at `target`.
    ///
    /// The target is stored verbatim; it is not mapped through the origin.
    pub fn symlink(&self, target: &str, tree_path: &str) -> FsResult<()> {
        let real = self.realify(tree_path);
        std::os::unix::fs::symlink(target, &real)
            .map_err(|e| FsError::backing_store("symlink", real, e))
    }

    /// Read a symlink's target.
    pub fn read_link(&self, tree_path: &str) -> FsResult<String> {
        let real = self.realify(tree_path);
        fs::read_link(&real)
            .map(|target| target.to_string_lossy().into_owned())
            .map_err(|e| FsError::backing_store("readlink", real, e))
    }

    /// Change a node's permission bits.
    pub fn chmod(&self, tree_path: &str, mode: u32) -> FsResult<()> {
        let real = self.realify(tree_path);
        fs::set_permissions(&real, fs::Permissions::from_mode(mode))
            .map_err(|e| FsError::backing_store("chmod", real, e))
    }

    /// Change a node's access and modification times.
    ///
    /// A missing time is filled in from the node's current metadata, so a
    /// caller can set either time independently.
    pub fn chtimes(
        &self,
        tree_path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> FsResult<()> {
        if atime.is_none() && mtime.is_none() {
            return Ok(());
        }

        let real = self.realify(tree_path);
        let meta = fs::metadata(&real)
            .map_err(|e| FsError::backing_store("chtimes", real.clone(), e))?;
        let atime = match atime {
            Some(t) => t,
            None => meta
                .accessed()
                .map_err(|e| FsError::backing_store("chtimes", real.clone(), e))?,
        };
        let mtime = match mtime {
            Some(t) => t,
            None => meta
                .modified()
                .map_err(|e| FsError::backing_store("chtimes", real.clone(), e))?,
        };

        let cpath = CString::new(real.as_os_str().as_bytes()).map_err(|_| {
            FsError::backing_store(
                "chtimes",
                real.clone(),
                io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"),
            )
        })?;
        let times = [to_timeval(atime), to_timeval(mtime)];

        // No std API for setting file times; go through libc.
        let rc = unsafe { libc::utimes(cpath.as_ptr(), times.as_ptr()) };
        if rc != 0 {
            return Err(FsError::backing_store(
                "chtimes",
                real,
                io::Error::last_os_error(),
            ));
        }
        Ok(())
    }

    /// Write `data` at `offset`. The file must already exist.
    ///
    /// Returns the number of bytes written (always `data.len()` on success).
    pub fn write_at(&self, tree_path: &str, data: &[u8], offset: u64) -> FsResult<usize> {
        let real = self.realify(tree_path);
        let file = OpenOptions::new()
            .write(true)
            .open(&real)
            .map_err(|e| FsError::backing_store("write", real.clone(), e))?;
        file.write_all_at(data, offset)
            .map_err(|e| FsError::backing_store("write", real, e))?;
        Ok(data.len())
    }

    /// Read up to `size` bytes at `offset`.
    ///
    /// Short reads at end of file return the available bytes; an offset at
    /// or past end of file returns an empty buffer.
    pub fn read_at(&self, tree_path: &str, offset: u64, size: usize) -> FsResult<Vec<u8>> {
        let real = self.realify(tree_path);
        let file = fs::File::open(&real)
            .map_err(|e| FsError::backing_store("read", real.clone(), e))?;

        let mut buffer = vec![0u8; size];
        let bytes_read = file
            .read_at(&mut buffer, offset)
            .map_err(|e| FsError::backing_store("read", real, e))?;
        buffer.truncate(bytes_read);
        Ok(buffer)
    }
}

fn to_timeval(t: SystemTime) -> libc::timeval {
    let since_epoch = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    libc::timeval {
        tv_sec: since_epoch.as_secs() as libc::time_t,
        tv_usec: since_epoch.subsec_micros() as libc::suseconds_t,
    }
}
