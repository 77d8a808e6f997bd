use std::path::PathBuf;

use thiserror::Error;

/// A required field was missing at submission. The display text is the
/// notice shown to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields (title is empty)")]
    EmptyTitle,
    #[error("Please fill in all fields (description is empty)")]
    EmptyDescription,
    #[error("Please fill in all fields (no day selected)")]
    MissingDay,
    #[error("Please enter a username")]
    EmptyUsername,
}

/// Errors produced by the key-value store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on slot {slot}: {source}")]
    Io {
        slot: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize slot {slot}: {source}")]
    Serialize {
        slot: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No task with id {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a geolocation reading could not be taken. Never fatal to login.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("geolocation is not available on this device")]
    Unavailable,
    #[error("geolocation permission denied")]
    Denied,
    #[error("geolocation request timed out after {0}s")]
    TimedOut(u64),
}

/// The config file exists but could not be used; defaults apply.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
