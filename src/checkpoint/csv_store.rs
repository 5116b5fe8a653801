//! CSV-backed checkpoint files

use crate::checkpoint::traits::{CheckpointError, CheckpointRecord, CheckpointResult};
use std::collections::HashSet;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A checkpoint file holding rows of one record type
#[derive(Debug, Clone)]
pub struct CsvCheckpoint<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R: CheckpointRecord> CsvCheckpoint<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads every row of the checkpoint file
    ///
    /// A missing file yields an empty list. A file that cannot be decoded as
    /// rows of `R` is an error: silently ignoring it would cause the next
    /// persist to overwrite it.
    pub fn load(&self) -> CheckpointResult<Vec<R>> {
        if !self.path.exists() {
            tracing::debug!("No checkpoint at {}", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|source| {
            CheckpointError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut records = Vec::new();
        for row in reader.deserialize::<R>() {
            let record = row.map_err(|source| CheckpointError::Malformed {
                path: self.path.clone(),
                source,
            })?;
            records.push(record);
        }

        tracing::debug!(
            "Loaded {} rows from checkpoint {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    /// Loads the checkpoint together with the set of keys it already covers
    ///
    /// `resume_key` maps a row to the key of the work item that produced it;
    /// rows it maps to `None` contribute no key.
    pub fn load_with_keys<F>(&self, resume_key: F) -> CheckpointResult<(HashSet<String>, Vec<R>)>
    where
        F: Fn(&R) -> Option<String>,
    {
        let records = self.load()?;
        let processed = records.iter().filter_map(resume_key).collect();
        Ok((processed, records))
    }

    /// Writes the union of `prior` and `new`, deduplicated by natural key
    ///
    /// Rows are written to a temporary file in the same directory which then
    /// replaces the checkpoint in a single rename, so readers never observe a
    /// partially written file. Returns the number of rows written.
    pub fn persist(&self, prior: Vec<R>, new: Vec<R>) -> CheckpointResult<usize> {
        let merged = merge_by_key(prior, new);
        self.write_all(&merged)?;
        Ok(merged.len())
    }

    /// Replaces the checkpoint with exactly `records`
    pub fn write_all(&self, records: &[R]) -> CheckpointResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(&mut tmp);
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|source| CheckpointError::Write {
                        path: self.path.clone(),
                        source,
                    })?;
            }
            writer.flush()?;
        }
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path)
            .map_err(|e| CheckpointError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;

        tracing::debug!(
            "Persisted {} rows to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Concatenates `first` and `second`, keeping the first row seen for each
/// natural key
pub fn merge_by_key<R: CheckpointRecord>(first: Vec<R>, second: Vec<R>) -> Vec<R> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|record| seen.insert(record.natural_key()))
        .collect()
}
