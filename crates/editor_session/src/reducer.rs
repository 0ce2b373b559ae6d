//! Tab actions and the transition logic behind [`crate::TabSessionStore`].

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{NewTab, Tab, TabId, TabPatch};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Actions accepted by [`reduce_tabs`].
pub enum TabAction {
    /// Replace the whole ordered collection.
    SetAll(Vec<Tab>),
    /// Append a new tab.
    Add(NewTab),
    /// Close a tab by id.
    Remove {
        /// Tab to close.
        id: TabId,
    },
    /// Make exactly one tab active.
    Activate {
        /// Tab to activate.
        id: TabId,
    },
    /// Shallow-merge changes into one tab.
    Patch {
        /// Tab to patch.
        id: TabId,
        /// Fields to overwrite.
        patch: TabPatch,
    },
    /// Move the tab at `from` to position `to`.
    Reorder {
        /// Current index.
        from: usize,
        /// Target index.
        to: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of a successful transition.
pub enum TabChange {
    /// A tab was appended under this id.
    Added(TabId),
    /// The removed tab, or `None` when nothing matched.
    Removed(Option<Tab>),
    /// The collection was updated in place.
    Updated,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reducer errors. A failed action leaves the collection untouched.
pub enum SessionError {
    /// The target tab id was not found.
    #[error("tab not found: {0}")]
    TabNotFound(TabId),
    /// A tab with this id already exists.
    #[error("duplicate tab id: {0}")]
    DuplicateTab(TabId),
    /// A reorder index is outside the collection.
    #[error("tab index {index} out of range for {len} tabs")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Collection length.
        len: usize,
    },
}

/// Applies a [`TabAction`] to the ordered tab collection.
///
/// Every successful transition leaves exactly one active tab when the collection is non-empty.
///
/// # Errors
///
/// Returns [`SessionError`] when the action references a missing tab, introduces a duplicate id,
/// or uses an out-of-range index. The collection is not modified in that case.
pub fn reduce_tabs(tabs: &mut Vec<Tab>, action: TabAction) -> Result<TabChange, SessionError> {
    let change = match action {
        TabAction::SetAll(next) => {
            let mut seen = HashSet::with_capacity(next.len());
            if let Some(dup) = next.iter().find(|tab| !seen.insert(tab.id)) {
                return Err(SessionError::DuplicateTab(dup.id));
            }
            *tabs = next;
            renumber(tabs);
            TabChange::Updated
        }
        TabAction::Add(new_tab) => {
            let id = new_tab.id.unwrap_or_default();
            if tabs.iter().any(|tab| tab.id == id) {
                return Err(SessionError::DuplicateTab(id));
            }
            if new_tab.active {
                for tab in tabs.iter_mut() {
                    tab.active = false;
                }
            }
            let active = new_tab.active || tabs.is_empty();
            let order = tabs.len();
            tabs.push(Tab {
                id,
                file_name: new_tab.file_name,
                title: new_tab.title,
                content: new_tab.content,
                read_only: new_tab.read_only,
                dirty: new_tab.dirty,
                backup_synced: new_tab.backup_synced,
                active,
                order,
            });
            TabChange::Added(id)
        }
        TabAction::Remove { id } => {
            if tabs.is_empty() {
                return Ok(TabChange::Removed(None));
            }
            let Some(index) = tabs.iter().position(|tab| tab.id == id) else {
                return Ok(TabChange::Removed(None));
            };
            let removed = tabs.remove(index);
            if removed.active && !tabs.is_empty() {
                let promoted = index.saturating_sub(1).min(tabs.len() - 1);
                tabs[promoted].active = true;
            }
            TabChange::Removed(Some(removed))
        }
        TabAction::Activate { id } => {
            if !tabs.iter().any(|tab| tab.id == id) {
                return Err(SessionError::TabNotFound(id));
            }
            for tab in tabs.iter_mut() {
                tab.active = tab.id == id;
            }
            TabChange::Updated
        }
        TabAction::Patch { id, patch } => {
            let tab = tabs
                .iter_mut()
                .find(|tab| tab.id == id)
                .ok_or(SessionError::TabNotFound(id))?;
            patch.apply(tab);
            TabChange::Updated
        }
        TabAction::Reorder { from, to } => {
            let len = tabs.len();
            for index in [from, to] {
                if index >= len {
                    return Err(SessionError::IndexOutOfRange { index, len });
                }
            }
            let tab = tabs.remove(from);
            tabs.insert(to, tab);
            renumber(tabs);
            TabChange::Updated
        }
    };

    normalize_active(tabs);
    Ok(change)
}

fn renumber(tabs: &mut [Tab]) {
    for (index, tab) in tabs.iter_mut().enumerate() {
        tab.order = index;
    }
}

fn normalize_active(tabs: &mut [Tab]) {
    let Some(first_active) = tabs.iter().position(|tab| tab.active) else {
        if let Some(first) = tabs.first_mut() {
            first.active = true;
        }
        return;
    };
    for (index, tab) in tabs.iter_mut().enumerate() {
        tab.active = index == first_active;
    }
}
