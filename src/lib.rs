//! Metallum-Crawl: a resumable catalog crawler
//!
//! This crate crawls the Encyclopaedia Metallum catalog in three sequential
//! stages (bands, discographies, tracks). Each stage drains a bounded work
//! queue with a pool of concurrent workers, retries transient failures, and
//! persists its results to CSV checkpoint files so that an interrupted run can
//! be resumed without re-fetching records it already has.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod parser;
pub mod progress;
pub mod records;
pub mod state;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Metallum-Crawl operations
///
/// Item-level failures (a page that could not be fetched or parsed) are not
/// represented here; they are recorded in the failure files and never abort
/// a stage.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Missing seed input for stage {stage}: {path}")]
    MissingSeed { stage: &'static str, path: PathBuf },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::StageState,
        to: state::StageState,
    },

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true for errors caused by bad configuration or input files
    /// rather than by the crawl itself.
    pub fn is_fatal_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Checkpoint(_) | Self::MissingSeed { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Metallum-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_pipeline, PipelineOutcome, StageKind, StageReport};
pub use progress::ProgressReporter;
pub use state::{RunState, StageState};
