use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title of the read-only banner tab a fresh session starts with.
pub const WELCOME_TITLE: &str = "Welcome";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabId(pub Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One open document in the editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    /// Canonical storage path; `None` for scratch documents.
    pub file_name: Option<String>,
    pub title: String,
    pub content: String,
    pub read_only: bool,
    /// Content differs from the last explicit save.
    pub dirty: bool,
    /// Current content has been mirrored to the shadow backup file.
    pub backup_synced: bool,
    pub active: bool,
    pub order: usize,
}

impl Tab {
    /// Returns `true` when the tab's content still has to be mirrored to its backup file.
    ///
    /// Scratch tabs never need a backup: there is no path to derive one from.
    pub fn needs_backup(&self) -> bool {
        !self.backup_synced && self.file_name.is_some()
    }

    pub fn is_scratch(&self) -> bool {
        self.file_name.is_none()
    }
}

/// Tab creation request accepted by [`crate::TabAction::Add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTab {
    /// Explicit id; a fresh one is assigned when absent.
    pub id: Option<TabId>,
    pub file_name: Option<String>,
    pub title: String,
    pub content: String,
    pub read_only: bool,
    pub dirty: bool,
    pub backup_synced: bool,
    pub active: bool,
}

impl NewTab {
    /// A tab for a file opened from storage. The backup starts out in sync.
    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            title: path.clone(),
            file_name: Some(path),
            content: content.into(),
            backup_synced: true,
            active: true,
            ..Self::default()
        }
    }

    /// A scratch document with no storage path.
    pub fn scratch(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            backup_synced: true,
            active: true,
            ..Self::default()
        }
    }

    /// The read-only banner shown before any file is opened.
    pub fn welcome(app_version: &str) -> Self {
        let content = [
            "---------------------------------------".to_string(),
            format!("Sew Editor v{app_version}"),
            "---------------------------------------".to_string(),
            String::new(),
            "Open a folder to start editing. Unsaved edits are mirrored to hidden".to_string(),
            "`.tmp-sew-` files next to the original and offered back when the file".to_string(),
            "is opened again.".to_string(),
        ]
        .join("\n");
        let mut tab = Self::scratch(WELCOME_TITLE).with_content(content);
        tab.read_only = true;
        tab
    }

    pub fn with_id(mut self, id: TabId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn recovered(mut self) -> Self {
        self.dirty = true;
        self
    }
}

/// Shallow patch applied by [`crate::TabAction::Patch`]. `None` fields are left untouched.
///
/// `id` and `active` are deliberately absent; activation goes through
/// [`crate::TabAction::Activate`] so the single-active invariant cannot be bypassed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabPatch {
    pub file_name: Option<Option<String>>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub read_only: Option<bool>,
    pub dirty: Option<bool>,
    pub backup_synced: Option<bool>,
    pub order: Option<usize>,
}

impl TabPatch {
    /// Patch for a user edit: new content, dirty, backup out of date.
    pub fn edit(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            dirty: Some(true),
            backup_synced: Some(false),
            ..Self::default()
        }
    }

    /// Patch applied after an explicit save.
    pub fn saved() -> Self {
        Self {
            dirty: Some(false),
            backup_synced: Some(true),
            ..Self::default()
        }
    }

    /// Patch applied after a successful backup write.
    pub fn backup_written() -> Self {
        Self {
            backup_synced: Some(true),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, tab: &mut Tab) {
        if let Some(file_name) = self.file_name {
            tab.file_name = file_name;
        }
        if let Some(title) = self.title {
            tab.title = title;
        }
        if let Some(content) = self.content {
            tab.content = content;
        }
        if let Some(read_only) = self.read_only {
            tab.read_only = read_only;
        }
        if let Some(dirty) = self.dirty {
            tab.dirty = dirty;
        }
        if let Some(backup_synced) = self.backup_synced {
            tab.backup_synced = backup_synced;
        }
        if let Some(order) = self.order {
            tab.order = order;
        }
    }
}
