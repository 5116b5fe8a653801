//! Checkpoint module for persisting crawl results
//!
//! Each stage's output lives in a flat CSV file. Loading a file yields the
//! rows a previous run already obtained; persisting writes the union of those
//! rows and the newly fetched ones, deduplicated by natural key, replacing the
//! file atomically.

mod csv_store;
mod traits;

pub use csv_store::{merge_by_key, CsvCheckpoint};
pub use traits::{CheckpointError, CheckpointRecord, CheckpointResult};
