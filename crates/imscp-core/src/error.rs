use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`Persistence`](crate::system::Persistence) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is not a JSON object of strings: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a [`Session`](crate::session::Session) implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Well-formed JSON that does not fit the session's data model.
    #[error("state has the wrong shape: {0}")]
    InvalidShape(String),

    /// `loadFromJSON` is only honoured before the session is initialized.
    #[error("state can only be loaded before LMSInitialize")]
    AlreadyInitialized,

    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level error for the persistence bridge.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The persisted blob under `key` is not valid JSON.
    #[error("persisted state under {key:?} is not valid JSON: {source}")]
    MalformedState {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode session state for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read config {path}: {message}")]
    Config { path: PathBuf, message: String },
}
