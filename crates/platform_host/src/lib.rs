//! Typed host-domain contracts shared by the editor engine and its host adapters.
//!
//! This crate is the API-first boundary for platform services: the hierarchical storage
//! capability ([`DirectoryHandle`]), preference storage and user notifications. In-memory
//! adapters back tests and scratch sessions; [`NativeDirectory`] backs a real directory tree.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod fs;
pub mod host;
pub mod notifications;
pub mod storage;

pub use fs::memory::MemoryDirectory;
pub use fs::native::NativeDirectory;
pub use fs::path::{
    base_name, join_path, normalize_storage_path, parent_path, path_segments, split_leaf,
    validate_entry_name,
};
pub use fs::service::{DirectoryHandle, SharedDirectory, StorageFuture};
pub use fs::types::{DirectoryEntry, EntryKind, StorageError};
pub use host::HostServices;
pub use notifications::{
    MemoryNotificationService, NoopNotificationService, Notice, NotificationFuture,
    NotificationService,
};
pub use storage::prefs::{
    clear_pref, load_pref_with, save_pref_with, MemoryPrefsStore, NoopPrefsStore, PrefsError,
    PrefsStore, PrefsStoreFuture,
};
