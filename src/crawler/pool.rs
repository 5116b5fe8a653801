//! Worker pool draining a stage's work queue

use super::fetcher::Pacer;
use super::queue::{WorkItem, WorkQueue};
use super::stage::Stage;
use crate::progress::ProgressReporter;
use crate::state::{ItemOutcome, RunState};
use crate::CrawlError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sizing and pacing of a pool
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub workers: usize,
    pub courtesy_delay: Duration,
    /// Number of items that will be submitted, for progress lines
    pub total: usize,
}

impl PoolOptions {
    /// Queue capacity: twice the worker count
    pub fn queue_capacity(&self) -> usize {
        self.workers.max(1) * 2
    }
}

type Results<S> = RunState<<S as Stage>::Record, <S as Stage>::Failure>;

/// A fixed set of workers consuming one queue
///
/// Workers stop when the queue is closed and empty, or as soon as the
/// cancellation token fires; an item that is being processed when the token
/// fires is finished and recorded first.
pub struct WorkerPool<S: Stage> {
    queue: Arc<WorkQueue<S::Item>>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl<S: Stage> WorkerPool<S> {
    pub fn spawn(
        stage: Arc<S>,
        results: Arc<Results<S>>,
        options: PoolOptions,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        let queue = Arc::new(WorkQueue::new(options.queue_capacity()));
        let workers = options.workers.max(1);

        tracing::info!(
            "Starting {} {} workers (queue capacity {})",
            workers,
            stage.kind(),
            queue.capacity()
        );

        let handles = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    stage: Arc::clone(&stage),
                    queue: Arc::clone(&queue),
                    results: Arc::clone(&results),
                    progress: progress.clone(),
                    cancel: cancel.clone(),
                    pacer: Pacer::new(options.courtesy_delay),
                    total: options.total,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self {
            queue,
            handles,
            cancel,
        }
    }

    pub fn queue(&self) -> &WorkQueue<S::Item> {
        &self.queue
    }

    /// Hands an item to the workers, waiting while the queue is full
    ///
    /// Returns false if the run was cancelled before the item was accepted.
    pub async fn submit(&self, item: WorkItem<S::Item>) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = self.queue.enqueue(item) => result.is_ok(),
        }
    }

    /// Closes the queue and waits for every worker to stop
    ///
    /// Every worker is joined even if one of them panicked; the first join
    /// error is returned after all of them have stopped.
    pub async fn finish(self) -> Result<(), CrawlError> {
        self.queue.close();
        let mut first_error = None;
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

struct Worker<S: Stage> {
    id: usize,
    stage: Arc<S>,
    queue: Arc<WorkQueue<S::Item>>,
    results: Arc<Results<S>>,
    progress: ProgressReporter,
    cancel: CancellationToken,
    pacer: Pacer,
    total: usize,
}

impl<S: Stage> Worker<S> {
    async fn run(mut self) {
        let kind = self.stage.kind();

        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                item = self.queue.dequeue() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            let key = item.key.clone();
            let outcome = self.stage.process(item, &mut self.pacer).await;
            let failed = matches!(outcome, ItemOutcome::Failed(_));
            let tally = self.results.append(key.clone(), outcome);

            let percent = if self.total == 0 {
                100.0
            } else {
                tally.processed() as f64 * 100.0 / self.total as f64
            };
            if failed {
                tracing::warn!("{} item failed: {}", kind, key);
            } else {
                tracing::debug!("{} item done: {}", kind, key);
            }
            self.progress.report(format!(
                "[{}] {} records for {} of {} items ({:.1}%)",
                kind,
                tally.records,
                tally.processed(),
                self.total,
                percent
            ));
        }

        let reason = if self.cancel.is_cancelled() {
            "cancelled"
        } else {
            "queue drained"
        };
        tracing::debug!("{} worker {} stopped ({})", kind, self.id, reason);
        self.progress
            .report(format!("[{}] worker {} stopped: {}", kind, self.id, reason));
    }
}
