//! Checkpoint traits and error types

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or persisting checkpoint files
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Malformed checkpoint file {path}: {source}")]
    Malformed { path: PathBuf, source: csv::Error },

    #[error("Failed to write checkpoint file {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },

    #[error("Failed to replace checkpoint file {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// A row that can be stored in a checkpoint file
///
/// The natural key identifies the entity the row describes; a merged
/// checkpoint never holds two rows with the same natural key.
pub trait CheckpointRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn natural_key(&self) -> String;
}
