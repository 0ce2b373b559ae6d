//! Root handle that holds shadow backup writes until the test releases them.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use editor_sync::is_backup_name;
use platform_host::{
    DirectoryEntry, DirectoryHandle, MemoryDirectory, SharedDirectory, StorageError, StorageFuture,
};
use tokio::sync::Semaphore;

/// Wraps a [`MemoryDirectory`] root. Writes to backup names wait for a permit from `gate`;
/// every other operation passes straight through.
pub struct HeldBackups {
    inner: MemoryDirectory,
    pub gate: Rc<Semaphore>,
    pub held: Rc<Cell<usize>>,
}

impl HeldBackups {
    pub fn new(inner: MemoryDirectory) -> Self {
        Self {
            inner,
            gate: Rc::new(Semaphore::new(0)),
            held: Rc::default(),
        }
    }
}

impl DirectoryHandle for HeldBackups {
    fn entries<'a>(&'a self) -> StorageFuture<'a, Result<Vec<DirectoryEntry>, StorageError>> {
        self.inner.entries()
    }

    fn directory<'a>(
        &'a self,
        name: &'a str,
        create: bool,
    ) -> StorageFuture<'a, Result<SharedDirectory, StorageError>> {
        self.inner.directory(name, create)
    }

    fn read_file<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<Vec<u8>, StorageError>> {
        self.inner.read_file(name)
    }

    fn write_file<'a>(
        &'a self,
        name: &'a str,
        bytes: &'a [u8],
    ) -> StorageFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            if is_backup_name(name) {
                self.held.set(self.held.get() + 1);
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
                self.held.set(self.held.get() - 1);
            }
            self.inner.write_file(name, bytes).await
        })
    }

    fn remove_entry<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<(), StorageError>> {
        self.inner.remove_entry(name)
    }
}
