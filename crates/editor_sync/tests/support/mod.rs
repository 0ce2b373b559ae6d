//! Directory handle wrappers for observing worker behavior.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use platform_host::{
    DirectoryEntry, DirectoryHandle, MemoryDirectory, SharedDirectory, StorageError, StorageFuture,
};
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct Counters {
    pub listings: Cell<usize>,
    pub writes_started: Cell<usize>,
    pub writes_in_flight: Cell<usize>,
    pub max_writes_in_flight: Cell<usize>,
}

/// Root handle that counts root listings and holds every write until a permit is released.
///
/// Child directories are returned unwrapped.
pub struct ObservedDirectory {
    inner: MemoryDirectory,
    pub counters: Rc<Counters>,
    gate: Option<Rc<Semaphore>>,
}

impl ObservedDirectory {
    pub fn open(inner: MemoryDirectory) -> Self {
        Self {
            inner,
            counters: Rc::default(),
            gate: None,
        }
    }

    pub fn gated(inner: MemoryDirectory, gate: Rc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::open(inner)
        }
    }
}

impl DirectoryHandle for ObservedDirectory {
    fn entries<'a>(&'a self) -> StorageFuture<'a, Result<Vec<DirectoryEntry>, StorageError>> {
        self.counters.listings.set(self.counters.listings.get() + 1);
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
            let counters = &self.counters;
            counters.writes_started.set(counters.writes_started.get() + 1);
            counters.writes_in_flight.set(counters.writes_in_flight.get() + 1);
            counters.max_writes_in_flight.set(
                counters
                    .max_writes_in_flight
                    .get()
                    .max(counters.writes_in_flight.get()),
            );
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            let result = self.inner.write_file(name, bytes).await;
            counters.writes_in_flight.set(counters.writes_in_flight.get() - 1);
            result
        })
    }

    fn remove_entry<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<(), StorageError>> {
        self.inner.remove_entry(name)
    }
}
