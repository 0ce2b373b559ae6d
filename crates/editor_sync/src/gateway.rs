//! Path-addressed facade over the granted storage root.

use std::rc::Rc;

use platform_host::{
    normalize_storage_path, path_segments, split_leaf, DirectoryEntry, SharedDirectory,
    StorageError,
};
use tokio::sync::watch;
use tracing::debug;

/// Resolves slash-delimited logical paths against a host directory handle and broadcasts a
/// change signal after every successful mutation.
///
/// The change signal is a counter on a [`watch`] channel: subscribers only learn that *something*
/// changed, and several mutations between two reads coalesce into one wake-up.
#[derive(Clone)]
pub struct StorageGateway {
    root: SharedDirectory,
    changes: Rc<watch::Sender<u64>>,
}

impl StorageGateway {
    pub fn new(root: SharedDirectory) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            root,
            changes: Rc::new(changes),
        }
    }

    /// Returns a receiver that wakes after the next successful mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Number of mutations broadcast so far.
    pub fn change_count(&self) -> u64 {
        *self.changes.borrow()
    }

    /// Lists the immediate children of a directory, sorted by name descending.
    ///
    /// `""` and `"/"` both name the root.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StorageError> {
        let segments = path_segments(path)?;
        let dir = self.resolve(&segments, false, path).await?;
        let mut entries = dir.entries().await.map_err(|err| err.at(path))?;
        entries.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(entries)
    }

    /// Reads a file as UTF-8 text.
    pub async fn read_file(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes).map_err(|err| StorageError::transient(path, err.to_string()))
    }

    /// Creates or replaces a file, creating intermediate directories.
    pub async fn write_file(&self, path: &str, text: &str) -> Result<(), StorageError> {
        self.write_bytes(path, text.as_bytes()).await?;
        self.notify_change("write", path);
        Ok(())
    }

    pub async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let (parents, leaf) = split_leaf(path)?;
        let dir = self.resolve(&parents, false, path).await?;
        dir.remove_entry(leaf).await.map_err(|err| err.at(path))?;
        self.notify_change("delete", path);
        Ok(())
    }

    /// Copies `from` to `to` and removes `from`; one change notification.
    ///
    /// Not atomic: a failure after the copy leaves both paths present. Moving a path onto itself
    /// does nothing.
    pub async fn move_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        if normalize_storage_path(from)? == normalize_storage_path(to)? {
            return Ok(());
        }
        let bytes = self.read_bytes(from).await?;
        self.write_bytes(to, &bytes).await?;
        let (parents, leaf) = split_leaf(from)?;
        let source_dir = self.resolve(&parents, false, from).await?;
        source_dir
            .remove_entry(leaf)
            .await
            .map_err(|err| err.at(from))?;
        self.notify_change("move", to);
        Ok(())
    }

    /// Copies `from` to `to`, keeping the source; one change notification.
    pub async fn copy_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        if normalize_storage_path(from)? == normalize_storage_path(to)? {
            return Ok(());
        }
        let bytes = self.read_bytes(from).await?;
        self.write_bytes(to, &bytes).await?;
        self.notify_change("copy", to);
        Ok(())
    }

    /// Same as [`StorageGateway::move_file`].
    pub async fn rename_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        self.move_file(from, to).await
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let (parents, leaf) = split_leaf(path)?;
        let dir = self.resolve(&parents, false, path).await?;
        dir.read_file(leaf).await.map_err(|err| err.at(path))
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let (parents, leaf) = split_leaf(path)?;
        let dir = self.resolve(&parents, true, path).await?;
        dir.write_file(leaf, bytes).await.map_err(|err| err.at(path))
    }

    async fn resolve(
        &self,
        segments: &[&str],
        create: bool,
        path: &str,
    ) -> Result<SharedDirectory, StorageError> {
        let mut dir = Rc::clone(&self.root);
        for segment in segments {
            let child = dir
                .directory(segment, create)
                .await
                .map_err(|err| err.at(path))?;
            dir = child;
        }
        Ok(dir)
    }

    fn notify_change(&self, op: &'static str, path: &str) {
        self.changes.send_modify(|count| *count += 1);
        debug!(op, path, "storage changed");
    }
}
