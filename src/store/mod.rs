//! Named-slot key-value storage.
//!
//! Every slot holds a text value. Task and login data are JSON; the
//! current-user marker is a bare string.

pub mod tasks;

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

pub const TASKS_SLOT: &str = "tasks";
pub const CURRENT_USER_SLOT: &str = "currentUser";
pub const LOGIN_DATA_SLOT: &str = "loginData";
/// Holds the last `tasks` content that failed to parse.
pub const CORRUPT_TASKS_SLOT: &str = "tasks.corrupt";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError>;
    /// Removing an absent slot is not an error.
    fn remove(&self, slot: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        (**self).get(slot)
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(slot, value)
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        (**self).remove(slot)
    }
}

/// Outcome of reading a JSON slot.
#[derive(Debug)]
pub enum Loaded<T> {
    Absent,
    Value(T),
    Malformed { raw: String, error: serde_json::Error },
}

pub fn load_json<T, S>(store: &S, slot: &str) -> Result<Loaded<T>, StoreError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(slot)? else {
        return Ok(Loaded::Absent);
    };
    Ok(match serde_json::from_str(&raw) {
        Ok(value) => Loaded::Value(value),
        Err(error) => Loaded::Malformed { raw, error },
    })
}

pub fn save_json<T, S>(store: &S, slot: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        slot: slot.to_string(),
        source,
    })?;
    store.set(slot, &json)
}

/// One file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }

    fn io_err(slot: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            slot: slot.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.slot_path(slot)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(slot, e)),
        }
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_err(slot, e))?;

        // Write-then-rename so readers never see a partial slot.
        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!(".{slot}.tmp"));
        std::fs::write(&tmp, value).map_err(|e| Self::io_err(slot, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| Self::io_err(slot, e))?;
        log::debug!("Wrote slot {} ({} bytes)", slot, value.len());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(slot, e)),
        }
    }
}

/// In-process store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, std::collections::HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots().get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        self.slots().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        self.slots().remove(slot);
        Ok(())
    }
}
