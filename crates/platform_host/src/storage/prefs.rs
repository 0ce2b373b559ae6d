//! Preference storage contracts and adapters.
//!
//! Preferences hold the few values that outlive an editing session: the granted storage root
//! (`sew.root.v1`), sync tuning (`sew.sync.config.v1`) and the assistant endpoint
//! (`sew.assist.config.v1`). Each key carries one JSON document; bumping the version suffix is how
//! a value changes shape.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    future::Future,
    pin::Pin,
    rc::Rc,
};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Object-safe boxed future used by [`PrefsStore`] async methods.
pub type PrefsStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Host service holding one JSON document per preference key.
///
/// Adapters report failures as plain messages; the typed helpers below attach the key.
pub trait PrefsStore {
    /// Returns the raw JSON stored under `key`, if any.
    fn load_pref<'a>(
        &'a self,
        key: &'a str,
    ) -> PrefsStoreFuture<'a, Result<Option<String>, String>>;

    /// Replaces the raw JSON stored under `key`.
    fn save_pref<'a>(
        &'a self,
        key: &'a str,
        raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, Result<(), String>>;

    /// Forgets `key`. Forgetting an absent key succeeds.
    fn delete_pref<'a>(&'a self, key: &'a str) -> PrefsStoreFuture<'a, Result<(), String>>;
}

/// Failure of a typed preference access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefsError {
    /// The host store could not be reached.
    #[error("preference `{key}` unavailable: {message}")]
    Unavailable {
        /// Preference key.
        key: String,
        /// Host message.
        message: String,
    },
    /// The stored document does not match the expected shape.
    #[error("preference `{key}` malformed: {message}")]
    Malformed {
        /// Preference key.
        key: String,
        /// Decoder message.
        message: String,
    },
}

impl PrefsError {
    fn unavailable(key: &str, message: String) -> Self {
        Self::Unavailable {
            key: key.to_string(),
            message,
        }
    }

    fn malformed(key: &str, err: serde_json::Error) -> Self {
        Self::Malformed {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Store for hosts without durable storage: nothing is remembered between sessions.
pub struct NoopPrefsStore;

impl PrefsStore for NoopPrefsStore {
    fn load_pref<'a>(
        &'a self,
        _key: &'a str,
    ) -> PrefsStoreFuture<'a, Result<Option<String>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn save_pref<'a>(
        &'a self,
        _key: &'a str,
        _raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn delete_pref<'a>(&'a self, _key: &'a str) -> PrefsStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Default)]
struct MemoryPrefs {
    values: RefCell<HashMap<String, String>>,
    unavailable: Cell<bool>,
}

/// In-memory store. Clones share values, so a test can keep one clone and hand another to the
/// editor, then reuse the same values for a second session.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrefsStore {
    inner: Rc<MemoryPrefs>,
}

impl MemoryPrefsStore {
    /// Returns the raw JSON currently stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.values.borrow().get(key).cloned()
    }

    /// Makes every operation fail until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.set(unavailable);
    }

    fn check(&self) -> Result<(), String> {
        if self.inner.unavailable.get() {
            return Err("preference store unavailable".to_string());
        }
        Ok(())
    }
}

impl PrefsStore for MemoryPrefsStore {
    fn load_pref<'a>(
        &'a self,
        key: &'a str,
    ) -> PrefsStoreFuture<'a, Result<Option<String>, String>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.raw(key))
        })
    }

    fn save_pref<'a>(
        &'a self,
        key: &'a str,
        raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.check()?;
            self.inner
                .values
                .borrow_mut()
                .insert(key.to_string(), raw_json.to_string());
            Ok(())
        })
    }

    fn delete_pref<'a>(&'a self, key: &'a str) -> PrefsStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.check()?;
            self.inner.values.borrow_mut().remove(key);
            Ok(())
        })
    }
}

/// Reads and decodes the document stored under `key`. An absent key is `Ok(None)`.
///
/// # Errors
///
/// [`PrefsError::Unavailable`] when the store fails, [`PrefsError::Malformed`] when the document
/// does not decode as `T`.
pub async fn load_pref_with<S: PrefsStore + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
) -> Result<Option<T>, PrefsError> {
    let raw = store
        .load_pref(key)
        .await
        .map_err(|message| PrefsError::unavailable(key, message))?;
    raw.map(|raw| serde_json::from_str(&raw).map_err(|err| PrefsError::malformed(key, err)))
        .transpose()
}

/// Encodes `value` and stores it under `key`.
///
/// # Errors
///
/// [`PrefsError::Malformed`] when `value` cannot be encoded, [`PrefsError::Unavailable`] when the
/// store fails.
pub async fn save_pref_with<S: PrefsStore + ?Sized, T: Serialize>(
    store: &S,
    key: &str,
    value: &T,
) -> Result<(), PrefsError> {
    let raw = serde_json::to_string(value).map_err(|err| PrefsError::malformed(key, err))?;
    store
        .save_pref(key, &raw)
        .await
        .map_err(|message| PrefsError::unavailable(key, message))
}

/// Forgets `key`.
///
/// # Errors
///
/// [`PrefsError::Unavailable`] when the store fails.
pub async fn clear_pref<S: PrefsStore + ?Sized>(store: &S, key: &str) -> Result<(), PrefsError> {
    store
        .delete_pref(key)
        .await
        .map_err(|message| PrefsError::unavailable(key, message))
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde::{Deserialize, Serialize};

    use super::*;

    const ROOT: &str = "sew.root.v1";

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Root {
        location: String,
    }

    fn root(location: &str) -> Root {
        Root {
            location: location.to_string(),
        }
    }

    #[test]
    fn stored_root_survives_into_a_second_session() {
        let first = MemoryPrefsStore::default();
        block_on(save_pref_with(&first, ROOT, &root("/home/me/notes"))).expect("save");

        let second: &dyn PrefsStore = &first.clone();
        let loaded: Option<Root> = block_on(load_pref_with(second, ROOT)).expect("load");
        assert_eq!(loaded, Some(root("/home/me/notes")));
        assert_eq!(
            first.raw(ROOT).as_deref(),
            Some(r#"{"location":"/home/me/notes"}"#)
        );

        block_on(clear_pref(second, ROOT)).expect("clear");
        assert_eq!(first.raw(ROOT), None);
        block_on(clear_pref(second, ROOT)).expect("clearing twice is fine");
    }

    #[test]
    fn document_from_an_older_shape_is_malformed_with_its_key() {
        let store = MemoryPrefsStore::default();
        block_on(store.save_pref(ROOT, r#"{"path":"/old"}"#)).expect("save raw");

        let err = block_on(load_pref_with::<_, Root>(&store, ROOT)).expect_err("old shape");
        assert!(matches!(&err, PrefsError::Malformed { key, .. } if key == ROOT));
        assert!(err.to_string().contains(ROOT), "{err}");
    }

    #[test]
    fn unavailable_store_fails_every_helper() {
        let store = MemoryPrefsStore::default();
        block_on(save_pref_with(&store, ROOT, &root("/a"))).expect("save");
        store.set_unavailable(true);

        let unavailable = |err: PrefsError| matches!(err, PrefsError::Unavailable { .. });
        assert!(unavailable(
            block_on(load_pref_with::<_, Root>(&store, ROOT)).expect_err("load")
        ));
        assert!(unavailable(
            block_on(save_pref_with(&store, ROOT, &root("/b"))).expect_err("save")
        ));
        assert!(unavailable(block_on(clear_pref(&store, ROOT)).expect_err("clear")));

        store.set_unavailable(false);
        assert_eq!(store.raw(ROOT).as_deref(), Some(r#"{"location":"/a"}"#));
    }

    #[test]
    fn noop_store_remembers_nothing() {
        let store = NoopPrefsStore;
        block_on(save_pref_with(&store, ROOT, &root("/a"))).expect("save");
        let loaded: Option<Root> = block_on(load_pref_with(&store, ROOT)).expect("load");
        assert_eq!(loaded, None);
    }
}
