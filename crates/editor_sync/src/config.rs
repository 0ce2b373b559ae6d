//! Tuning knobs for the sync workers.

use std::time::Duration;

use platform_host::{load_pref_with, PrefsStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Preference key holding [`SyncConfig`].
pub const SYNC_CONFIG_KEY: &str = "sew.sync.config.v1";

const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
const DEFAULT_MIN_FLUSH_MS: u64 = 1_000;
const DEFAULT_MAX_FLUSH_MS: u64 = 2_000;
const DEFAULT_BACKUP_QUEUE_CAPACITY: usize = 64;
const DEFAULT_MAX_CONCURRENT_BACKUP_WRITES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Period of the background directory re-listing.
    pub poll_interval_ms: u64,
    /// Minimum spacing between two listings.
    pub min_flush_ms: u64,
    /// Longest a trigger may be held back before a listing is forced.
    pub max_flush_ms: u64,
    /// Tabs that may wait for a backup write at once.
    pub backup_queue_capacity: usize,
    /// Backup writes in flight at once, across all tabs.
    pub max_concurrent_backup_writes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            min_flush_ms: DEFAULT_MIN_FLUSH_MS,
            max_flush_ms: DEFAULT_MAX_FLUSH_MS,
            backup_queue_capacity: DEFAULT_BACKUP_QUEUE_CAPACITY,
            max_concurrent_backup_writes: DEFAULT_MAX_CONCURRENT_BACKUP_WRITES,
        }
    }
}

impl SyncConfig {
    /// Loads the persisted config, falling back to defaults when it is absent or unreadable.
    pub async fn load<S: PrefsStore + ?Sized>(prefs: &S) -> Self {
        match load_pref_with::<S, Self>(prefs, SYNC_CONFIG_KEY).await {
            Ok(Some(config)) => config.normalized(),
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(error = %err, "sync config unreadable; using defaults");
                Self::default()
            }
        }
    }

    /// Clamps values that would stall the workers.
    pub fn normalized(mut self) -> Self {
        if self.poll_interval_ms == 0 {
            warn!("poll_interval_ms must be positive; using default");
            self.poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
        }
        if self.max_flush_ms < self.min_flush_ms {
            warn!(
                min_flush_ms = self.min_flush_ms,
                max_flush_ms = self.max_flush_ms,
                "max_flush_ms below min_flush_ms; raising it"
            );
            self.max_flush_ms = self.min_flush_ms;
        }
        if self.backup_queue_capacity == 0 {
            warn!("backup_queue_capacity must be positive; using 1");
            self.backup_queue_capacity = 1;
        }
        if self.max_concurrent_backup_writes == 0 {
            warn!("max_concurrent_backup_writes must be positive; using 1");
            self.max_concurrent_backup_writes = 1;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn min_flush(&self) -> Duration {
        Duration::from_millis(self.min_flush_ms)
    }

    pub fn max_flush(&self) -> Duration {
        Duration::from_millis(self.max_flush_ms)
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use platform_host::{save_pref_with, MemoryPrefsStore};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_pref_yields_defaults() {
        let prefs = MemoryPrefsStore::default();
        let config = block_on(SyncConfig::load(&prefs));
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_pref_fills_remaining_fields() {
        let prefs = MemoryPrefsStore::default();
        block_on(platform_host::PrefsStore::save_pref(
            &prefs,
            SYNC_CONFIG_KEY,
            r#"{"poll_interval_ms":500}"#,
        ))
        .expect("save");

        let config = block_on(SyncConfig::load(&prefs));
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.min_flush_ms, 1_000);
    }

    #[test]
    fn invalid_values_are_clamped() {
        let prefs = MemoryPrefsStore::default();
        let stored = SyncConfig {
            poll_interval_ms: 0,
            min_flush_ms: 3_000,
            max_flush_ms: 1_000,
            backup_queue_capacity: 0,
            max_concurrent_backup_writes: 0,
        };
        block_on(save_pref_with(&prefs, SYNC_CONFIG_KEY, &stored)).expect("save");

        let config = block_on(SyncConfig::load(&prefs));
        assert_eq!(
            config,
            SyncConfig {
                poll_interval_ms: 10_000,
                min_flush_ms: 3_000,
                max_flush_ms: 3_000,
                backup_queue_capacity: 1,
                max_concurrent_backup_writes: 1,
            }
        );
    }

    #[test]
    fn malformed_pref_falls_back_to_defaults() {
        let prefs = MemoryPrefsStore::default();
        block_on(platform_host::PrefsStore::save_pref(
            &prefs,
            SYNC_CONFIG_KEY,
            "[",
        ))
        .expect("save");

        assert_eq!(block_on(SyncConfig::load(&prefs)), SyncConfig::default());
    }
}
