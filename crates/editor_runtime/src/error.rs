use editor_session::SessionError;
use platform_host::{PrefsError, StorageError};
use thiserror::Error;

use crate::assist::AssistError;

/// Failure of a user-level editor action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Assist(#[from] AssistError),
    /// The tab rejects edits and saves.
    #[error("`{0}` is read-only")]
    ReadOnly(String),
    /// Save was requested for a tab with no file; use save-as.
    #[error("`{0}` has no file yet")]
    Untitled(String),
    #[error("no folder is open")]
    NoFolderOpen,
    #[error("invalid file name `{0}`")]
    InvalidName(String),
    #[error("`{0}` already exists")]
    AlreadyExists(String),
    /// The user declined a confirmation.
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Prefs(#[from] PrefsError),
}
