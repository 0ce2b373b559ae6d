//! Notification-domain contracts and adapters.

mod service;

pub use service::{
    MemoryNotificationService, NoopNotificationService, Notice, NotificationFuture,
    NotificationService,
};
