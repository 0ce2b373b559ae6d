//! Storage data types shared across host contracts and implementations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Directory entry kind.
pub enum EntryKind {
    /// File entry.
    File,
    /// Directory entry.
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Immediate child returned by a directory listing.
pub struct DirectoryEntry {
    /// Base name of the entry.
    pub name: String,
    /// File or directory kind.
    pub kind: EntryKind,
}

impl DirectoryEntry {
    /// Creates a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    /// Creates a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Returns `true` when the entry name begins with a dot.
    pub fn hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Returns `true` for file entries.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failure reported by a host storage operation.
pub enum StorageError {
    /// A path segment or the leaf entry does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Path (or segment) that could not be resolved.
        path: String,
    },
    /// The host capability was revoked or does not allow the operation.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// Path the operation targeted.
        path: String,
    },
    /// The logical path cannot address an entry (empty leaf, `.` or `..` segments).
    #[error("invalid path `{path}`")]
    InvalidPath {
        /// Offending logical path.
        path: String,
    },
    /// Any other host storage failure.
    #[error("storage failure at {path}: {message}")]
    TransientIo {
        /// Path the operation targeted.
        path: String,
        /// Host-provided failure detail.
        message: String,
    },
}

impl StorageError {
    /// Builds a [`StorageError::NotFound`] for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Builds a [`StorageError::PermissionDenied`] for `path`.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    /// Builds a [`StorageError::InvalidPath`] for `path`.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Builds a [`StorageError::TransientIo`] for `path`.
    pub fn transient(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Maps a native I/O error onto the storage taxonomy.
    pub fn from_io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::TransientIo {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Returns `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Re-targets the error at a full logical path, keeping its kind.
    pub fn at(self, path: &str) -> Self {
        match self {
            Self::NotFound { .. } => Self::not_found(path),
            Self::PermissionDenied { .. } => Self::permission_denied(path),
            Self::InvalidPath { .. } => Self::invalid_path(path),
            Self::TransientIo { message, .. } => Self::transient(path, message),
        }
    }
}
