//! shadowfs - a shadowed filesystem namespace
//!
//! This library keeps two representations of one directory tree in sync: an
//! in-memory node tree (the namespace the protocol adapter resolves against)
//! and the real backing directory on disk. Every namespace-mutating
//! operation is first offered to an optional user-registered hook, then
//! applied to the tree, then to the disk, in that fixed order (remove runs
//! disk-then-tree so concurrent lookups never see a tree entry whose disk
//! path is already gone).
//!
//! # Example
//!
//! ```no_run
//! use shadowfs::{Hooks, ShadowVolume, VolumeConfig};
//!
//! let hooks = Hooks::new().on_create(|req| {
//!     println!("creating {} in {}", req.name, req.path);
//!     Ok(())
//! });
//! let volume = ShadowVolume::new(VolumeConfig::new("/data/pack"), hooks);
//!
//! let docs = volume.mkdir("", "docs", 0o755)?;
//! let readme = volume.create("docs", "readme", 0o644)?;
//! volume.write("docs/readme", b"hello", 0)?;
//! assert_eq!(readme.path, "docs/readme");
//! # Ok::<(), shadowfs::FsError>(())
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod ident;
pub mod logging;
pub mod path;
pub mod store;
pub mod tree;
pub mod volume;

pub use config::VolumeConfig;
pub use error::{FsError, FsResult};
pub use hooks::Hooks;
pub use store::DiskStore;
pub use tree::{DirEntry, DuplicatePolicy, FileTree, FileType, NodeKind};
pub use volume::{NodeInfo, ShadowVolume};

/// Version of the shadowfs library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
