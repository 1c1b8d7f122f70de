use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::storage::{Storage, StorageError};

/// A typed value mirrored to one storage key.
///
/// Loads once on construction, falling back to the default when the key is
/// missing, unreadable or fails to parse. Every update writes the new value
/// back. A failed write is logged and switches the value to in-memory only
/// for the rest of the session; callers never see storage errors.
///
/// Stored text that fails to parse is never lost: before the first write
/// replaces it, it is copied to a sibling key `<key>-unreadable-<n>`.
pub struct Persisted<T> {
    storage: Rc<dyn Storage>,
    key: String,
    value: T,
    /// Raw stored text that could not be decoded, still awaiting set-aside
    unreadable: Option<String>,
    degraded: bool,
}

/// Outcome of reading one key
enum Stored<T> {
    Value(T),
    Missing,
    /// Present but not decodable as `T`
    Unreadable(String),
    /// The medium itself failed; nothing is known about the stored value
    Failed,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn load(storage: Rc<dyn Storage>, key: &str, default: T) -> Self {
        let mut persisted = Persisted {
            storage,
            key: key.to_string(),
            value: default,
            unreadable: None,
            degraded: false,
        };
        match read_value(persisted.storage.as_ref(), key) {
            Stored::Value(value) => persisted.value = value,
            Stored::Missing => {}
            Stored::Unreadable(raw) => persisted.unreadable = Some(raw),
            // Writing blind could clobber a value we never saw
            Stored::Failed => persisted.degraded = true,
        }
        persisted
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Whether writes have been abandoned for this session
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Replace the value and write it back.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.write();
    }

    /// Compute the next value from the current one and write it back.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value);
        self.set(next);
    }

    /// Re-read the stored value, e.g. after another process changed it.
    /// Keeps the current value if the stored one is missing or unreadable.
    /// Returns whether a value was loaded.
    pub fn reload(&mut self) -> bool {
        match read_value(self.storage.as_ref(), &self.key) {
            Stored::Value(value) => {
                self.value = value;
                self.unreadable = None;
                true
            }
            Stored::Unreadable(raw) => {
                self.unreadable = Some(raw);
                false
            }
            Stored::Missing | Stored::Failed => false,
        }
    }

    fn write(&mut self) {
        if self.degraded {
            return;
        }
        if let Some(raw) = self.unreadable.take() {
            match set_aside(self.storage.as_ref(), &self.key, &raw) {
                Ok(backup) => tracing::warn!(
                    key = %self.key,
                    backup = %backup,
                    "unreadable stored value copied aside before overwrite"
                ),
                Err(err) => {
                    tracing::warn!(
                        key = %self.key,
                        error = %err,
                        "could not copy aside unreadable value; keeping changes in memory for this session"
                    );
                    self.unreadable = Some(raw);
                    self.degraded = true;
                    return;
                }
            }
        }
        let result = serde_json::to_string(&self.value)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.storage
                    .set_item(&self.key, &json)
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(()) => tracing::debug!(key = %self.key, "saved"),
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "could not save; keeping changes in memory for this session"
                );
                self.degraded = true;
            }
        }
    }
}

/// Copy `raw` to the first free `<key>-unreadable-<n>` key. Returns that key.
fn set_aside(storage: &dyn Storage, key: &str, raw: &str) -> Result<String, StorageError> {
    let mut n = 1;
    loop {
        let backup = format!("{}-unreadable-{}", key, n);
        if storage.get_item(&backup)?.is_none() {
            storage.set_item(&backup, raw)?;
            return Ok(backup);
        }
        n += 1;
    }
}

fn read_value<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Stored<T> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!(key, "nothing stored, using default");
            return Stored::Missing;
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "could not read storage, using default");
            return Stored::Failed;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Stored::Value(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "stored value is corrupt, using default");
            Stored::Unreadable(raw)
        }
    }
}
