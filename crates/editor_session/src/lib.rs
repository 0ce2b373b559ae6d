//! In-memory tab session for the editor: the tab model, its transition reducer and the observable
//! store the sync workers and the workspace share.

pub mod model;
pub mod reducer;
pub mod stats;
pub mod store;

pub use model::{NewTab, Tab, TabId, TabPatch, WELCOME_TITLE};
pub use reducer::{reduce_tabs, SessionError, TabAction, TabChange};
pub use stats::ContentStats;
pub use store::{Subscription, TabSessionStore, TabsSnapshot};
