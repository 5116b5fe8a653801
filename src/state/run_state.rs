use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// What processing one work item produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome<R, F> {
    /// The item's page(s) were fetched and parsed; holds its records
    Completed(Vec<R>),

    /// The item failed permanently; holds the failure row to persist
    Failed(F),
}

/// Counters observed after an append, used for progress lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunTally {
    pub completed: usize,
    pub failed: usize,
    pub records: usize,
}

impl RunTally {
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }
}

/// Everything a stage accumulated, taken out of the [`RunState`] once the
/// workers have stopped
#[derive(Debug)]
pub struct RunResults<R, F> {
    pub records: Vec<R>,
    pub failures: Vec<F>,
    /// Keys of the work items that completed successfully
    pub completed_keys: HashSet<String>,
}

impl<R, F> Default for RunResults<R, F> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            completed_keys: HashSet::new(),
        }
    }
}

/// Shared accumulation of a running stage's results
///
/// Workers only ever touch this through [`RunState::append`], which records
/// one item's whole outcome under a single lock acquisition.
#[derive(Debug)]
pub struct RunState<R, F> {
    inner: Mutex<Inner<R, F>>,
}

#[derive(Debug)]
struct Inner<R, F> {
    results: RunResults<R, F>,
    tally: RunTally,
}

impl<R, F> Default for RunState<R, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, F> RunState<R, F> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                results: RunResults::default(),
                tally: RunTally::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<R, F>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records the outcome of the work item identified by `key`
    pub fn append(&self, key: String, outcome: ItemOutcome<R, F>) -> RunTally {
        let mut inner = self.lock();
        match outcome {
            ItemOutcome::Completed(records) => {
                inner.tally.completed += 1;
                inner.tally.records += records.len();
                inner.results.records.extend(records);
                inner.results.completed_keys.insert(key);
            }
            ItemOutcome::Failed(failure) => {
                inner.tally.failed += 1;
                inner.results.failures.push(failure);
            }
        }
        inner.tally
    }

    pub fn tally(&self) -> RunTally {
        self.lock().tally
    }

    /// Takes the accumulated results, leaving the state empty
    pub fn take(&self) -> RunResults<R, F> {
        let mut inner = self.lock();
        inner.tally = RunTally::default();
        std::mem::take(&mut inner.results)
    }
}
