//! State module for tracking stage progress
//!
//! # Components
//!
//! - `StageState`: The lifecycle of a single crawl stage (seeding, enqueuing, draining, persisting)
//! - `RunState`: The synchronized accumulation of a running stage's records and failures

mod run_state;
mod stage_state;

// Re-export main types
pub use run_state::{ItemOutcome, RunResults, RunState, RunTally};
pub use stage_state::StageState;
