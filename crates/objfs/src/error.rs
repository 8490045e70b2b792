//! Error types for objfs
//!
//! This module provides error types for the path layer with the following design goals:
//! - A small, fixed taxonomy the caller can match on (`NotFound`, `NotAFile`, ...)
//! - Backend failures propagated unmodified, with the failing path attached
//! - Cheap cloning, so one coalesced failure can be handed to every waiter

use std::sync::Arc;
use thiserror::Error;

use crate::capability::Capability;

/// Result type alias using objfs's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a storage backend.
pub type StorageError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// objfs error types.
///
/// Every variant is `Clone`: sources are held behind `Arc` so a listing error
/// shared by concurrent callers is observed identically by all of them.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The path does not resolve to any object.
    #[error("object not found")]
    NotFound,

    /// A directory was expected but the path resolved to a file.
    #[error("not a folder")]
    NotADirectory,

    /// A file was expected but the path resolved to a directory.
    #[error("not a file")]
    NotAFile,

    /// The backend lacks a capability the operation requires.
    #[error("not implemented: {0}")]
    NotImplemented(Capability),

    /// The caller that started a shared listing went away before it finished.
    ///
    /// Every caller that joined the listing receives this error.
    #[error("operation cancelled")]
    Cancelled,

    /// The backend or adapter is structurally misconfigured.
    ///
    /// Raised at startup when the backend cannot describe its own root.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Configuration or backend addition could not be decoded.
    #[error("invalid json: {0}")]
    Decode(Arc<serde_json::Error>),

    /// I/O error while reading or streaming content.
    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),

    /// Backend-native failure (network, auth, throttling, ...).
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// An error with a message describing what was being attempted.
    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a backend-native error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }

    /// Attach a context message to this error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any context layers.
    pub fn root_cause(&self) -> &Error {
        let mut err = self;
        while let Error::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// Whether this error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Error::NotFound)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

/// Context helpers for `Result`.
pub trait ResultExt<T> {
    /// Wrap the error with a fixed message.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Wrap the error with a lazily built message.
    fn with_context<M: Into<String>>(self, f: impl FnOnce() -> M) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }

    fn with_context<M: Into<String>>(self, f: impl FnOnce() -> M) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}
