//! Error types for the shadowed namespace.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for namespace operations.
pub type FsResult<T> = Result<T, FsError>;

/// Errors that can occur while mutating or resolving the namespace.
///
/// The variant identifies which step of an operation failed: hook rejection
/// happens before any mutation, the tree-level variants after the hook, and
/// [`FsError::BackingStore`] when the mapped disk operation fails. No
/// rollback is performed, so a `BackingStore` failure after a successful
/// tree step leaves the two representations divergent.
#[derive(Debug, Error)]
pub enum FsError {
    /// A path component does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Attempted a child operation under a file or symlink.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Remove attempted on a non-empty directory.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// Insert attempted over an existing name under the reject policy.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Readlink attempted on a node that is not a symlink.
    #[error("not a symbolic link: {0}")]
    NotASymlink(String),

    /// A registered hook vetoed the operation before any mutation.
    #[error("{operation} hook rejected {path}: {reason}")]
    HookRejected {
        operation: &'static str,
        path: String,
        reason: String,
    },

    /// A structural invariant was violated during a tree mutation.
    #[error("tree mutation failed during {operation} on {path}: {detail}")]
    TreeMutationFailed {
        operation: &'static str,
        path: String,
        detail: String,
    },

    /// The mapped disk operation failed.
    #[error("backing store {operation} failed on {path}: {source}")]
    BackingStore {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Create a PathNotFound error.
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create a NotEmpty error.
    pub fn not_empty(path: impl Into<String>) -> Self {
        Self::NotEmpty(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a BackingStore error wrapping the underlying I/O failure.
    pub fn backing_store(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::BackingStore {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Convert to `std::io::Error` for the protocol adapter's benefit.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::PathNotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FsError::NotEmpty(msg) => io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg),
            FsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FsError::NotASymlink(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            e @ FsError::HookRejected { .. } => {
                io::Error::new(io::ErrorKind::PermissionDenied, e.to_string())
            }
            e @ FsError::TreeMutationFailed { .. } => io::Error::other(e.to_string()),
            FsError::BackingStore { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_path_context() {
        let err = FsError::path_not_found("docs/readme");
        assert!(err.to_string().contains("docs/readme"));

        let err = FsError::HookRejected {
            operation: "create",
            path: "docs".to_string(),
            reason: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("create"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_backing_store_preserves_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = FsError::backing_store("remove", "/real/docs", io_err);
        assert!(err.to_string().contains("remove"));
        assert!(err.to_string().contains("/real/docs"));

        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_io_conversion_kinds() {
        let err: io::Error = FsError::not_empty("docs").into();
        assert_eq!(err.kind(), io::ErrorKind::DirectoryNotEmpty);

        let err: io::Error = FsError::not_a_directory("docs/readme").into();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
    }
}
