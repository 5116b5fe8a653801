//! Crawler module for fetching and processing catalog pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and courtesy pacing
//! - Paginated listing downloads
//! - The bounded work queue and worker pool
//! - The three stages and their orchestration

mod coordinator;
mod endpoints;
mod fetcher;
mod listing;
mod pool;
mod queue;
mod stage;
mod stages;

pub use coordinator::{
    run_pipeline, run_stage, Coordinator, PipelineOutcome, StageContext, StageFiles, StagePlan,
    StageReport,
};
pub use endpoints::Endpoints;
pub use fetcher::{
    build_http_client, default_headers, run_with_retry, FailureReason, FetchOutcome, Fetcher,
    Pacer, RawResponse, RetryPolicy,
};
pub use listing::{BucketListing, ListingClient, ListingError};
pub use pool::{PoolOptions, WorkerPool};
pub use queue::{QueueClosed, WorkItem, WorkQueue};
pub use stage::{Stage, StageKind};
pub use stages::{AlbumRef, AlbumStage, BandRef, BandStage, TrackStage};
