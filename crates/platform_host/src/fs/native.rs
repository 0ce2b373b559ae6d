//! Native filesystem directory adapter rooted at a real directory.

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use super::{
    path::validate_entry_name,
    service::{DirectoryHandle, SharedDirectory, StorageFuture},
    types::{DirectoryEntry, StorageError},
};

/// Suffix of the hidden sibling used to stage writes before the final rename.
const PARTIAL_WRITE_SUFFIX: &str = ".sew-partial";

#[derive(Debug, Clone)]
/// Directory handle backed by `std::fs`.
///
/// Names are validated as single segments, so a handle never addresses entries outside its own
/// directory. Writes are staged in a hidden sibling file and renamed into place.
pub struct NativeDirectory {
    path: PathBuf,
}

impl NativeDirectory {
    /// Opens an existing directory as a storage root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when `root` does not exist and
    /// [`StorageError::TransientIo`] when it is not a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        let label = root.display().to_string();
        let metadata = fs::metadata(root).map_err(|err| StorageError::from_io(&label, &err))?;
        if !metadata.is_dir() {
            return Err(StorageError::transient(label, "root is not a directory"));
        }
        let path = fs::canonicalize(root).map_err(|err| StorageError::from_io(&label, &err))?;
        Ok(Self { path })
    }

    /// Returns the native path this handle points at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn child_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let name = validate_entry_name(name)?;
        Ok(self.path.join(name))
    }

    fn label(path: &Path) -> String {
        path.display().to_string()
    }

    fn list(&self) -> Result<Vec<DirectoryEntry>, StorageError> {
        let label = Self::label(&self.path);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(|err| StorageError::from_io(&label, &err))? {
            let entry = entry.map_err(|err| StorageError::from_io(&label, &err))?;
            let file_type = entry
                .file_type()
                .map_err(|err| StorageError::from_io(&label, &err))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if file_type.is_dir() {
                entries.push(DirectoryEntry::directory(name));
            } else {
                entries.push(DirectoryEntry::file(name));
            }
        }
        Ok(entries)
    }

    fn resolve_directory(&self, name: &str, create: bool) -> Result<SharedDirectory, StorageError> {
        let native = self.child_path(name)?;
        let label = Self::label(&native);
        match fs::metadata(&native) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StorageError::transient(label, "entry is a file, not a directory")),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && create => {
                fs::create_dir(&native).map_err(|err| StorageError::from_io(&label, &err))?;
            }
            Err(err) => return Err(StorageError::from_io(label, &err)),
        }
        Ok(Rc::new(Self { path: native }))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let native = self.child_path(name)?;
        fs::read(&native).map_err(|err| StorageError::from_io(Self::label(&native), &err))
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let native = self.child_path(name)?;
        let label = Self::label(&native);
        if native.is_dir() {
            return Err(StorageError::transient(label, "entry is a directory, not a file"));
        }
        let staged = self.path.join(format!(".{name}{PARTIAL_WRITE_SUFFIX}"));
        fs::write(&staged, bytes).map_err(|err| StorageError::from_io(&label, &err))?;
        if let Err(err) = fs::rename(&staged, &native) {
            let _ = fs::remove_file(&staged);
            return Err(StorageError::from_io(label, &err));
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let native = self.child_path(name)?;
        let label = Self::label(&native);
        let metadata = fs::metadata(&native).map_err(|err| StorageError::from_io(&label, &err))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir(&native)
        } else {
            fs::remove_file(&native)
        };
        removed.map_err(|err| StorageError::from_io(label, &err))
    }
}

impl DirectoryHandle for NativeDirectory {
    fn entries<'a>(&'a self) -> StorageFuture<'a, Result<Vec<DirectoryEntry>, StorageError>> {
        Box::pin(async move { self.list() })
    }

    fn directory<'a>(
        &'a self,
        name: &'a str,
        create: bool,
    ) -> StorageFuture<'a, Result<SharedDirectory, StorageError>> {
        Box::pin(async move { self.resolve_directory(name, create) })
    }

    fn read_file<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move { self.read(name) })
    }

    fn write_file<'a>(
        &'a self,
        name: &'a str,
        bytes: &'a [u8],
    ) -> StorageFuture<'a, Result<(), StorageError>> {
        Box::pin(async move { self.write(name, bytes) })
    }

    fn remove_entry<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Result<(), StorageError>> {
        Box::pin(async move { self.remove(name) })
    }
}
