/// Stage lifecycle states
///
/// This module defines the states a crawl stage passes through and the
/// transitions allowed between them.
use crate::CrawlError;
use std::fmt;

/// Represents the current state of a crawl stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
    // ===== Active States =====
    /// Loading the checkpoint and building the work items
    Seeding,

    /// Pushing work items onto the queue
    Enqueuing,

    /// Waiting for the workers to finish every enqueued item
    Draining,

    /// Writing the merged results after a complete drain
    Persisting,

    /// Writing partial results after cancellation
    Flushing,

    // ===== Terminal State =====
    /// Results are on disk
    Done,
}

impl StageState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the stage is writing its checkpoint files
    pub fn is_persisting(&self) -> bool {
        matches!(self, Self::Persisting | Self::Flushing)
    }

    /// Returns true if `to` may directly follow this state
    pub fn can_transition_to(&self, to: StageState) -> bool {
        matches!(
            (self, to),
            (Self::Seeding, Self::Enqueuing)
                | (Self::Enqueuing, Self::Draining)
                | (Self::Draining, Self::Persisting)
                | (Self::Draining, Self::Flushing)
                | (Self::Persisting, Self::Done)
                | (Self::Flushing, Self::Done)
        )
    }

    /// Moves to `to`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, to: StageState) -> Result<(), CrawlError> {
        if !self.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition { from: *self, to });
        }
        tracing::debug!("Stage state {} -> {}", self, to);
        *self = to;
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Enqueuing => "enqueuing",
            Self::Draining => "draining",
            Self::Persisting => "persisting",
            Self::Flushing => "flushing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
