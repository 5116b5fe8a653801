//! The contract every crawl stage implements

use super::fetcher::Pacer;
use super::queue::WorkItem;
use crate::checkpoint::CheckpointRecord;
use crate::state::ItemOutcome;
use std::fmt;
use std::future::Future;

/// The three crawl stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Bands,
    Albums,
    Tracks,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [Self::Bands, Self::Albums, Self::Tracks];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bands => "bands",
            Self::Albums => "albums",
            Self::Tracks => "tracks",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One crawl stage: how to process a work item, and how a persisted record
/// maps back to the work item it came from
pub trait Stage: Send + Sync + 'static {
    type Item: Send + 'static;
    type Record: CheckpointRecord;
    type Failure: CheckpointRecord;

    fn kind(&self) -> StageKind;

    /// Key of the work item that produced `record`
    ///
    /// Must agree with [`WorkItem::key`] of the seeds, and with the natural
    /// key of the stage's failure rows. `None` if a row cannot be traced back
    /// to its item; such a stage needs a completion ledger to resume.
    fn resume_key(&self, record: &Self::Record) -> Option<String>;

    /// Fetches and parses one work item
    ///
    /// Never errors: every failure becomes an [`ItemOutcome::Failed`] row.
    fn process(
        &self,
        item: WorkItem<Self::Item>,
        pacer: &mut Pacer,
    ) -> impl Future<Output = ItemOutcome<Self::Record, Self::Failure>> + Send;
}
