// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::WatcherState;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Workspace root not found: {0:?}")]
    RootNotFound(PathBuf),

    #[error("Workspace root is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Cannot {operation} a watcher that is {state}")]
    IllegalState {
        operation: &'static str,
        state: WatcherState,
    },

    #[error("Unknown event kind {0} received")]
    UnrecognizedEventKind(String),

    #[error("Watch backend has been closed")]
    BackendClosed,

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;
