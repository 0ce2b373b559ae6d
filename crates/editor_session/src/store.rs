//! Observable owner of the tab collection.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use crate::model::{NewTab, Tab, TabId, TabPatch};
use crate::reducer::{reduce_tabs, SessionError, TabAction, TabChange};

/// Immutable view of the tab collection after a transition.
pub type TabsSnapshot = Rc<Vec<Tab>>;

type Observer = Rc<dyn Fn(&TabsSnapshot)>;

struct StoreInner {
    tabs: RefCell<TabsSnapshot>,
    observers: RefCell<Vec<(u64, Observer)>>,
    next_observer_id: Cell<u64>,
}

/// Shared handle to the in-memory tab session. Clones address the same session.
///
/// Every successful [`TabSessionStore::dispatch`] notifies observers synchronously with the
/// post-transition snapshot, including transitions that change nothing.
#[derive(Clone)]
pub struct TabSessionStore {
    inner: Rc<StoreInner>,
}

impl Default for TabSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabSessionStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                tabs: RefCell::new(Rc::new(Vec::new())),
                observers: RefCell::new(Vec::new()),
                next_observer_id: Cell::new(0),
            }),
        }
    }

    /// A session seeded with the read-only welcome tab.
    pub fn with_welcome(app_version: &str) -> Self {
        let store = Self::new();
        let mut tabs = Vec::new();
        // An empty collection cannot reject a fresh id.
        let _ = reduce_tabs(&mut tabs, TabAction::Add(NewTab::welcome(app_version)));
        *store.inner.tabs.borrow_mut() = Rc::new(tabs);
        store
    }

    /// Applies `action` and notifies observers.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the reducer; observers are not notified and the collection
    /// is unchanged in that case.
    pub fn dispatch(&self, action: TabAction) -> Result<TabChange, SessionError> {
        let change = {
            let mut tabs = self.inner.tabs.borrow_mut();
            let mut next = Vec::clone(&tabs);
            let change = reduce_tabs(&mut next, action)?;
            *tabs = Rc::new(next);
            change
        };
        self.notify();
        Ok(change)
    }

    fn notify(&self) {
        let observers: Vec<Observer> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            // Re-read per observer: an earlier observer may have dispatched again.
            let snapshot = self.tabs();
            observer(&snapshot);
        }
    }

    /// Registers `observer`; it stays registered until the returned guard is dropped.
    pub fn subscribe(&self, observer: impl Fn(&TabsSnapshot) + 'static) -> Subscription {
        let id = self.inner.next_observer_id.get();
        self.inner.next_observer_id.set(id + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Current snapshot of the ordered collection.
    pub fn tabs(&self) -> TabsSnapshot {
        self.inner.tabs.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.tabs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tabs.borrow().is_empty()
    }

    pub fn get(&self, id: TabId) -> Option<Tab> {
        self.inner
            .tabs
            .borrow()
            .iter()
            .find(|tab| tab.id == id)
            .cloned()
    }

    pub fn get_active(&self) -> Option<Tab> {
        self.inner
            .tabs
            .borrow()
            .iter()
            .find(|tab| tab.active)
            .cloned()
    }

    /// Finds the open tab backed by `file_name`.
    pub fn find_by_file_name(&self, file_name: &str) -> Option<Tab> {
        self.inner
            .tabs
            .borrow()
            .iter()
            .find(|tab| tab.file_name.as_deref() == Some(file_name))
            .cloned()
    }

    pub fn set_all(&self, tabs: Vec<Tab>) -> Result<(), SessionError> {
        self.dispatch(TabAction::SetAll(tabs)).map(|_| ())
    }

    /// Appends a tab and returns its id.
    pub fn add(&self, tab: NewTab) -> Result<TabId, SessionError> {
        let id = tab.id.unwrap_or_default();
        self.dispatch(TabAction::Add(tab.with_id(id)))?;
        Ok(id)
    }

    /// Closes a tab; returns it when it existed.
    pub fn remove_by_id(&self, id: TabId) -> Option<Tab> {
        match self.dispatch(TabAction::Remove { id }) {
            Ok(TabChange::Removed(tab)) => tab,
            _ => None,
        }
    }

    pub fn set_active_by_id(&self, id: TabId) -> Result<(), SessionError> {
        self.dispatch(TabAction::Activate { id }).map(|_| ())
    }

    pub fn patch_by_id(&self, id: TabId, patch: TabPatch) -> Result<(), SessionError> {
        self.dispatch(TabAction::Patch { id, patch }).map(|_| ())
    }

    pub fn reorder(&self, from: usize, to: usize) -> Result<(), SessionError> {
        self.dispatch(TabAction::Reorder { from, to }).map(|_| ())
    }
}

/// Guard returned by [`TabSessionStore::subscribe`]; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner
                .observers
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}
