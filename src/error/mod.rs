//! Error types and Result aliases for termrank.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using termrank's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for termrank operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Document reading error.
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),

    /// Directory watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while tokenizing a document.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The document could not be opened.
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A line of the document could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Directory watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Operation not allowed in the watcher's current state.
    #[error("invalid watcher state: {0}")]
    InvalidState(String),

    /// The watch thread could not be spawned.
    #[error("failed to spawn watch thread: {0}")]
    Spawn(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl ReaderError {
    /// Path of the document that failed.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }
}
