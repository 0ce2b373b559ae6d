//! In-memory directory tree adapter.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use super::{
    service::{DirectoryHandle, SharedDirectory, StorageFuture},
    types::{DirectoryEntry, StorageError},
};

#[derive(Debug, Clone)]
enum MemoryNode {
    File(Rc<RefCell<Vec<u8>>>),
    Directory(MemoryDirectory),
}

#[derive(Debug, Default)]
struct Access {
    revoked: Cell<bool>,
}

#[derive(Debug, Clone)]
/// In-memory directory handle used by tests and scratch sessions.
///
/// Clones share the same underlying tree. Every handle derived from one root shares its access
/// flag, so [`MemoryDirectory::revoke`] affects the whole tree.
pub struct MemoryDirectory {
    name: String,
    entries: Rc<RefCell<BTreeMap<String, MemoryNode>>>,
    access: Rc<Access>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new_root()
    }
}

impl MemoryDirectory {
    /// Creates an empty root directory.
    pub fn new_root() -> Self {
        Self {
            name: String::new(),
            entries: Rc::new(RefCell::new(BTreeMap::new())),
            access: Rc::new(Access::default()),
        }
    }

    /// Returns this handle as a shared trait object.
    pub fn shared(&self) -> SharedDirectory {
        Rc::new(self.clone())
    }

    /// Revokes access; every subsequent operation fails with [`StorageError::PermissionDenied`].
    pub fn revoke(&self) {
        self.access.revoked.set(true);
    }

    /// Restores access after [`MemoryDirectory::revoke`].
    pub fn restore(&self) {
        self.access.revoked.set(false);
    }

    fn child(&self, name: &str) -> Self {
        Self {
            name: self.label(name),
            entries: Rc::new(RefCell::new(BTreeMap::new())),
            access: Rc::clone(&self.access),
        }
    }

    fn check_access(&self, name: &str) -> Result<(), StorageError> {
        if self.access.revoked.get() {
            Err(StorageError::permission_denied(self.label(name)))
        } else {
            Ok(())
        }
    }

    fn label(&self, name: &str) -> String {
        if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.name, name)
        }
    }
}

impl DirectoryHandle for MemoryDirectory {
    fn entries<'a>(&'a self) -> StorageFuture<'a, Result<Vec<DirectoryEntry>, StorageError>> {
        Box::pin(async move {
            self.check_access("")?;
            Ok(self
                .entries
                .borrow()
                .iter()
                .map(|(name, node)| match node {
                    MemoryNode::File(_) => DirectoryEntry::file(name.clone()),
                    MemoryNode::Directory(_) => DirectoryEntry::directory(name.clone()),
                })
                .collect())
        })
    }

    fn directory<'a>(
        &'a self,
        name: &'a str,
        create: bool,
    ) -> StorageFuture<'a, Result<SharedDirectory, StorageError>> {
        Box::pin(async move {
            self.check_access(name)?;
            let mut entries = self.entries.borrow_mut();
            match entries.get(name) {
                Some(MemoryNode::Directory(dir)) => Ok(dir.shared()),
                Some(MemoryNode::File(_)) => Err(StorageError::transient(
                    self.label(name),
                    "entry is a file, not a directory",
                )),
                None if create => {
                    let dir = self.child(name);
                    entries.insert(name.to_string(), MemoryNode::Directory(dir.clone()));
                    Ok(dir.shared())
                }
                None => Err(StorageError::not_found(self.label(name))),
            }
        })
    }

    fn read_file<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move {
            self.check_access(name)?;
            match self.entries.borrow().get(name) {
                Some(MemoryNode::File(bytes)) => Ok(bytes.borrow().clone()),
                Some(MemoryNode::Directory(_)) => Err(StorageError::transient(
                    self.label(name),
                    "entry is a directory, not a file",
                )),
                None => Err(StorageError::not_found(self.label(name))),
            }
        })
    }

    fn write_file<'a>(
        &'a self,
        name: &'a str,
        bytes: &'a [u8],
    ) -> StorageFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.check_access(name)?;
            let mut entries = self.entries.borrow_mut();
            match entries.get(name) {
                Some(MemoryNode::Directory(_)) => Err(StorageError::transient(
                    self.label(name),
                    "entry is a directory, not a file",
                )),
                Some(MemoryNode::File(existing)) => {
                    *existing.borrow_mut() = bytes.to_vec();
                    Ok(())
                }
                None => {
                    entries.insert(
                        name.to_string(),
                        MemoryNode::File(Rc::new(RefCell::new(bytes.to_vec()))),
                    );
                    Ok(())
                }
            }
        })
    }

    fn remove_entry<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.check_access(name)?;
            let mut entries = self.entries.borrow_mut();
            if let Some(MemoryNode::Directory(dir)) = entries.get(name) {
                if !dir.entries.borrow().is_empty() {
                    return Err(StorageError::transient(
                        self.label(name),
                        "directory is not empty",
                    ));
                }
            }
            entries
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StorageError::not_found(self.label(name)))
        })
    }
}
