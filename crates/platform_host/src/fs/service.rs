//! Host storage capability contracts.

use std::{future::Future, pin::Pin, rc::Rc};

use super::types::{DirectoryEntry, StorageError};

/// Object-safe boxed future used by [`DirectoryHandle`] async methods.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Shared handle to a directory in the host storage tree.
pub type SharedDirectory = Rc<dyn DirectoryHandle>;

/// Host-granted handle to one directory of a hierarchical storage tree.
///
/// All names passed to a handle are single path segments; multi-segment resolution is done by
/// callers walking [`DirectoryHandle::directory`].
pub trait DirectoryHandle {
    /// Lists immediate children in host order.
    fn entries<'a>(&'a self) -> StorageFuture<'a, Result<Vec<DirectoryEntry>, StorageError>>;

    /// Resolves a child directory, creating it when `create` is set.
    fn directory<'a>(
        &'a self,
        name: &'a str,
        create: bool,
    ) -> StorageFuture<'a, Result<SharedDirectory, StorageError>>;

    /// Reads the full byte content of a child file.
    fn read_file<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<Vec<u8>, StorageError>>;

    /// Creates or replaces a child file with `bytes`.
    ///
    /// Implementations must not expose partially written content to readers.
    fn write_file<'a>(
        &'a self,
        name: &'a str,
        bytes: &'a [u8],
    ) -> StorageFuture<'a, Result<(), StorageError>>;

    /// Removes a child file or empty directory.
    fn remove_entry<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<(), StorageError>>;
}
