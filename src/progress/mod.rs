//! Progress reporting
//!
//! A [`ProgressReporter`] is a cloneable handle to a set of plaintext sinks
//! (standard output, an append-only log file, or any writer). Every call to
//! [`ProgressReporter::report`] writes one complete timestamped line of the
//! form `[<timestamp>]: <message>` to each sink while holding a single lock,
//! so lines from concurrent workers never interleave.
//!
//! Progress lines are separate from `tracing` diagnostics: they are the
//! user-facing status feed, and a disabled reporter changes nothing else
//! about a run.

use crate::config::ProgressConfig;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

type Sink = Box<dyn Write + Send>;

/// Synchronized, timestamped status line sink
#[derive(Clone)]
pub struct ProgressReporter {
    sinks: Option<Arc<Mutex<Vec<Sink>>>>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ProgressReporter {
    /// A reporter that discards every message
    pub fn disabled() -> Self {
        Self { sinks: None }
    }

    /// A reporter writing to standard output
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// A reporter writing to an arbitrary writer
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sinks: Some(Arc::new(Mutex::new(vec![Box::new(writer)]))),
        }
    }

    /// Builds a reporter from the `[progress]` configuration section
    pub fn from_config(config: &ProgressConfig) -> io::Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let mut sinks: Vec<Sink> = Vec::new();
        if config.stdout {
            sinks.push(Box::new(io::stdout()));
        }
        if let Some(path) = &config.log_file {
            sinks.push(Box::new(open_log_file(path)?));
        }

        if sinks.is_empty() {
            return Ok(Self::disabled());
        }

        Ok(Self {
            sinks: Some(Arc::new(Mutex::new(sinks))),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.sinks.is_some()
    }

    /// Writes one timestamped line to every sink
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn report(&self, message: impl AsRef<str>) {
        let Some(sinks) = &self.sinks else {
            return;
        };

        let line = format!(
            "[{}]: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            message.as_ref()
        );

        let mut sinks = match sinks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
                tracing::warn!("Failed to write progress line: {}", e);
            }
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}
