//! Host service bundle injected into the editor runtime.

use std::rc::Rc;

use crate::{
    MemoryNotificationService, MemoryPrefsStore, NoopNotificationService, NoopPrefsStore,
    NotificationService, PrefsStore,
};

/// Runtime-selected host services shared by the editor runtime.
///
/// The storage root is not part of the bundle: it is granted later (by a folder picker or a
/// restored handle) and may be replaced during a session.
#[derive(Clone)]
pub struct HostServices {
    /// Durable preference store (stored root handle, tuning knobs).
    pub prefs: Rc<dyn PrefsStore>,
    /// User-visible notification delivery.
    pub notifications: Rc<dyn NotificationService>,
}

impl HostServices {
    /// Bundle backed by no-op adapters.
    pub fn noop() -> Self {
        Self {
            prefs: Rc::new(NoopPrefsStore),
            notifications: Rc::new(NoopNotificationService),
        }
    }

    /// Bundle backed by in-memory adapters; the concrete adapters are returned for inspection.
    pub fn memory() -> (Self, MemoryPrefsStore, MemoryNotificationService) {
        let prefs = MemoryPrefsStore::default();
        let notifications = MemoryNotificationService::default();
        let services = Self {
            prefs: Rc::new(prefs.clone()),
            notifications: Rc::new(notifications.clone()),
        };
        (services, prefs, notifications)
    }
}
