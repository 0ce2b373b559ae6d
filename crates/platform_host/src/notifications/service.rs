//! Notification service contracts and adapters.

use std::{cell::RefCell, future::Future, pin::Pin, rc::Rc};

/// Object-safe boxed future used by [`NotificationService`].
pub type NotificationFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Host service for non-blocking, user-visible notifications.
pub trait NotificationService {
    /// Dispatches a notification message.
    fn notify<'a>(
        &'a self,
        title: &'a str,
        body: &'a str,
    ) -> NotificationFuture<'a, Result<(), String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op notification service for hosts without a notification surface.
pub struct NoopNotificationService;

impl NotificationService for NoopNotificationService {
    fn notify<'a>(
        &'a self,
        _title: &'a str,
        _body: &'a str,
    ) -> NotificationFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Notification captured by [`MemoryNotificationService`].
pub struct Notice {
    /// Short title.
    pub title: String,
    /// Detail text.
    pub body: String,
}

#[derive(Debug, Clone, Default)]
/// Notification service that records every notice in memory. Clones share the log.
pub struct MemoryNotificationService {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl MemoryNotificationService {
    /// Returns every notice dispatched so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }
}

impl NotificationService for MemoryNotificationService {
    fn notify<'a>(
        &'a self,
        title: &'a str,
        body: &'a str,
    ) -> NotificationFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.notices.borrow_mut().push(Notice {
                title: title.to_string(),
                body: body.to_string(),
            });
            Ok(())
        })
    }
}
