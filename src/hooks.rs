//! Pre-mutation interception hooks.
//!
//! For each mutating operation kind an optional callback may be registered.
//! The volume invokes the matching hook synchronously, on the calling
//! thread, before any tree or disk mutation; a hook returning an error
//! vetoes the whole operation and nothing is mutated. Unregistered kinds
//! are treated as unconditional success.
//!
//! The dispatcher provides no timeout of its own: a hook that blocks holds
//! up its operation, so bounding hook latency is the registrant's job.
//!
//! Hooks are registered through the [`Hooks`] builder rather than a
//! positional constructor, so a volume can subscribe to any subset of the
//! eight operation kinds:
//!
//! ```
//! use shadowfs::hooks::Hooks;
//!
//! let hooks = Hooks::new()
//!     .on_create(|req| {
//!         println!("creating {} in {}", req.name, req.path);
//!         Ok(())
//!     })
//!     .on_remove(|_req| Err("volume is frozen".to_string()));
//! ```

use crate::error::{FsError, FsResult};
use std::time::SystemTime;

/// Outcome of a hook invocation; an `Err` vetoes the operation.
pub type HookResult = Result<(), String>;

/// Payload for a create interception. `path` is the parent directory.
#[derive(Debug)]
pub struct CreateRequest<'a> {
    pub path: &'a str,
    pub name: &'a str,
    pub mode: u32,
}

/// Payload for a write interception. `path` is the node being written.
#[derive(Debug)]
pub struct WriteRequest<'a> {
    pub path: &'a str,
    pub data: &'a [u8],
    pub offset: u64,
}

/// Payload for a remove interception. `path` is the parent directory.
#[derive(Debug)]
pub struct RemoveRequest<'a> {
    pub path: &'a str,
    pub name: &'a str,
}

/// Payload for a rename interception. `path` is the source directory and
/// `new_dir` the destination directory.
#[derive(Debug)]
pub struct RenameRequest<'a> {
    pub path: &'a str,
    pub old_name: &'a str,
    pub new_name: &'a str,
    pub new_dir: &'a str,
}

/// Payload for a mkdir interception. `path` is the parent directory.
#[derive(Debug)]
pub struct MkdirRequest<'a> {
    pub path: &'a str,
    pub name: &'a str,
    pub mode: u32,
}

/// Payload for a hard-link interception. `path` is the directory receiving
/// the new name, `old_path` the existing node being linked.
#[derive(Debug)]
pub struct LinkRequest<'a> {
    pub path: &'a str,
    pub new_name: &'a str,
    pub old_path: &'a str,
}

/// Payload for a symlink interception. `path` is the parent directory.
#[derive(Debug)]
pub struct SymlinkRequest<'a> {
    pub path: &'a str,
    pub target: &'a str,
    pub new_name: &'a str,
}

/// Payload for an attribute-change interception. `path` is the node.
#[derive(Debug)]
pub struct SetattrRequest<'a> {
    pub path: &'a str,
    pub mode: Option<u32>,
    pub atime: Option<SystemTime>,
    pub mtime: Option<SystemTime>,
}

type CreateHook = Box<dyn Fn(&CreateRequest<'_>) -> HookResult + Send + Sync>;
type WriteHook = Box<dyn Fn(&WriteRequest<'_>) -> HookResult + Send + Sync>;
type RemoveHook = Box<dyn Fn(&RemoveRequest<'_>) -> HookResult + Send + Sync>;
type RenameHook = Box<dyn Fn(&RenameRequest<'_>) -> HookResult + Send + Sync>;
type MkdirHook = Box<dyn Fn(&MkdirRequest<'_>) -> HookResult + Send + Sync>;
type LinkHook = Box<dyn Fn(&LinkRequest<'_>) -> HookResult + Send + Sync>;
type SymlinkHook = Box<dyn Fn(&SymlinkRequest<'_>) -> HookResult + Send + Sync>;
type SetattrHook = Box<dyn Fn(&SetattrRequest<'_>) -> HookResult + Send + Sync>;

/// Registry of optional per-operation interception callbacks.
#[derive(Default)]
pub struct Hooks {
    create: Option<CreateHook>,
    write: Option<WriteHook>,
    remove: Option<RemoveHook>,
    rename: Option<RenameHook>,
    mkdir: Option<MkdirHook>,
    link: Option<LinkHook>,
    symlink: Option<SymlinkHook>,
    setattr: Option<SetattrHook>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("create", &self.create.is_some())
            .field("write", &self.write.is_some())
            .field("remove", &self.remove.is_some())
            .field("rename", &self.rename.is_some())
            .field("mkdir", &self.mkdir.is_some())
            .field("link", &self.link.is_some())
            .field("symlink", &self.symlink.is_some())
            .field("setattr", &self.setattr.is_some())
            .finish()
    }
}

impl Hooks {
    /// An empty registry: every operation kind passes unconditionally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the create hook.
    pub fn on_create(
        mut self,
        hook: impl Fn(&CreateRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.create = Some(Box::new(hook));
        self
    }

    /// Register the write hook.
    pub fn on_write(
        mut self,
        hook: impl Fn(&WriteRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.write = Some(Box::new(hook));
        self
    }

    /// Register the remove hook.
    pub fn on_remove(
        mut self,
        hook: impl Fn(&RemoveRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.remove = Some(Box::new(hook));
        self
    }

    /// Register the rename hook.
    pub fn on_rename(
        mut self,
        hook: impl Fn(&RenameRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.rename = Some(Box::new(hook));
        self
    }

    /// Register the mkdir hook.
    pub fn on_mkdir(
        mut self,
        hook: impl Fn(&MkdirRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.mkdir = Some(Box::new(hook));
        self
    }

    /// Register the hard-link hook.
    pub fn on_link(
        mut self,
        hook: impl Fn(&LinkRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.link = Some(Box::new(hook));
        self
    }

    /// Register the symlink hook.
    pub fn on_symlink(
        mut self,
        hook: impl Fn(&SymlinkRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.symlink = Some(Box::new(hook));
        self
    }

    /// Register the setattr hook.
    pub fn on_setattr(
        mut self,
        hook: impl Fn(&SetattrRequest<'_>) -> HookResult + Send + Sync + 'static,
    ) -> Self {
        self.setattr = Some(Box::new(hook));
        self
    }

    pub(crate) fn check_create(&self, req: &CreateRequest<'_>) -> FsResult<()> {
        match &self.create {
            Some(hook) => hook(req).map_err(|reason| rejected("create", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_write(&self, req: &WriteRequest<'_>) -> FsResult<()> {
        match &self.write {
            Some(hook) => hook(req).map_err(|reason| rejected("write", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_remove(&self, req: &RemoveRequest<'_>) -> FsResult<()> {
        match &self.remove {
            Some(hook) => hook(req).map_err(|reason| rejected("remove", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_rename(&self, req: &RenameRequest<'_>) -> FsResult<()> {
        match &self.rename {
            Some(hook) => hook(req).map_err(|reason| rejected("rename", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_mkdir(&self, req: &MkdirRequest<'_>) -> FsResult<()> {
        match &self.mkdir {
            Some(hook) => hook(req).map_err(|reason| rejected("mkdir", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_link(&self, req: &LinkRequest<'_>) -> FsResult<()> {
        match &self.link {
            Some(hook) => hook(req).map_err(|reason| rejected("link", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_symlink(&self, req: &SymlinkRequest<'_>) -> FsResult<()> {
        match &self.symlink {
            Some(hook) => hook(req).map_err(|reason| rejected("symlink", req.path, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn check_setattr(&self, req: &SetattrRequest<'_>) -> FsResult<()> {
        match &self.setattr {
            Some(hook) => hook(req).map_err(|reason| rejected("setattr", req.path, reason)),
            None => Ok(()),
        }
    }
}

fn rejected(operation: &'static str, path: &str, reason: String) -> FsError {
    FsError::HookRejected {
        operation,
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_unregistered_hook_passes() {
        let hooks = Hooks::new();
        let req = CreateRequest {
            path: "docs",
            name: "readme",
            mode: 0o644,
        };
        assert!(hooks.check_create(&req).is_ok());
    }

    #[test]
    fn test_hook_receives_payload() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let hooks = Hooks::new().on_create(move |req| {
            assert_eq!(req.path, "docs");
            assert_eq!(req.name, "readme");
            assert_eq!(req.mode, 0o644);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let req = CreateRequest {
            path: "docs",
            name: "readme",
            mode: 0o644,
        };
        assert!(hooks.check_create(&req).is_ok());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_error_becomes_rejection() {
        let hooks = Hooks::new().on_remove(|_| Err("frozen".to_string()));
        let req = RemoveRequest {
            path: "docs",
            name: "readme",
        };
        let err = hooks.check_remove(&req).unwrap_err();
        assert!(matches!(
            err,
            FsError::HookRejected { operation: "remove", .. }
        ));
        assert!(err.to_string().contains("frozen"));
    }

    #[test]
    fn test_hooks_cover_distinct_operations() {
        let hooks = Hooks::new()
            .on_write(|req| {
                assert_eq!(req.offset, 4);
                assert_eq!(req.data, b"data");
                Ok(())
            })
            .on_rename(|req| {
                assert_eq!(req.old_name, "a");
                assert_eq!(req.new_name, "b");
                Ok(())
            })
            .on_symlink(|req| {
                assert_eq!(req.target, "a");
                Ok(())
            });

        assert!(hooks
            .check_write(&WriteRequest {
                path: "f",
                data: b"data",
                offset: 4,
            })
            .is_ok());
        assert!(hooks
            .check_rename(&RenameRequest {
                path: "",
                old_name: "a",
                new_name: "b",
                new_dir: "",
            })
            .is_ok());
        assert!(hooks
            .check_symlink(&SymlinkRequest {
                path: "",
                target: "a",
                new_name: "ln",
            })
            .is_ok());
        // Kinds without a registered hook still pass.
        assert!(hooks
            .check_mkdir(&MkdirRequest {
                path: "",
                name: "d",
                mode: 0o755,
            })
            .is_ok());
    }

    #[test]
    fn test_debug_lists_registered_kinds() {
        let hooks = Hooks::new().on_create(|_| Ok(()));
        let debug = format!("{:?}", hooks);
        assert!(debug.contains("create: true"));
        assert!(debug.contains("remove: false"));
    }
}
