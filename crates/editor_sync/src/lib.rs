//! Storage-side half of the editor engine.
//!
//! [`StorageGateway`] addresses the granted root by logical path and broadcasts changes.
//! [`BackupReconciler`] mirrors unsynced tabs to shadow files named by [`backup_path`], and
//! [`FileTreePoller`] keeps a [`FileTree`] view current with throttled re-listings.

pub mod backup_path;
pub mod config;
pub mod gateway;
pub mod poller;
pub mod reconciler;
pub mod throttle;
pub mod tree;

pub use backup_path::{backup_path, is_backup_name, original_name, BACKUP_PREFIX};
pub use config::{SyncConfig, SYNC_CONFIG_KEY};
pub use gateway::StorageGateway;
pub use poller::FileTreePoller;
pub use reconciler::{BackupReconciler, ReconcilerStatus};
pub use throttle::{Throttle, ThrottleDecision};
pub use tree::{FileTree, TreeNode};
