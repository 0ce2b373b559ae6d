//! Persisted handle to the granted storage root.

use std::path::Path;

use platform_host::{
    clear_pref, load_pref_with, save_pref_with, NativeDirectory, PrefsStore, SharedDirectory,
};
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Preference key holding the [`StoredRoot`].
pub const ROOT_KEY: &str = "sew.root.v1";

/// The single durable record of the editor: where the granted root lives.
///
/// Tab session state is never persisted; unsaved work survives through backup files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRoot {
    /// Absolute native directory path.
    pub location: String,
    /// Display label, the last path component.
    pub label: String,
}

impl StoredRoot {
    pub fn for_native(dir: &NativeDirectory) -> Self {
        let path = dir.path();
        Self {
            location: path.to_string_lossy().into_owned(),
            label: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        }
    }

    /// Re-opens the stored directory.
    pub fn open(&self) -> Result<SharedDirectory, EditorError> {
        let dir = NativeDirectory::open(Path::new(&self.location))?;
        Ok(std::rc::Rc::new(dir))
    }

    pub async fn load<S: PrefsStore + ?Sized>(prefs: &S) -> Result<Option<Self>, EditorError> {
        Ok(load_pref_with(prefs, ROOT_KEY).await?)
    }

    pub async fn save<S: PrefsStore + ?Sized>(&self, prefs: &S) -> Result<(), EditorError> {
        Ok(save_pref_with(prefs, ROOT_KEY, self).await?)
    }

    pub async fn clear<S: PrefsStore + ?Sized>(prefs: &S) -> Result<(), EditorError> {
        Ok(clear_pref(prefs, ROOT_KEY).await?)
    }
}
