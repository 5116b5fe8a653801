//! Crawler coordinator - stage orchestration
//!
//! This module runs the three stages in order. For each stage it:
//! - Loads the stage's checkpoint and derives the set of finished work items
//! - Enqueues every seed that is not finished yet
//! - Waits for the worker pool to drain (or for cancellation)
//! - Persists the merged records and failures atomically

use super::endpoints::Endpoints;
use super::fetcher::Fetcher;
use super::listing::ListingClient;
use super::pool::{PoolOptions, WorkerPool};
use super::queue::WorkItem;
use super::stage::{Stage, StageKind};
use super::stages::{AlbumStage, BandStage, TrackStage};
use crate::checkpoint::{merge_by_key, CheckpointRecord, CsvCheckpoint};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::records::{
    AlbumRecord, BandRecord, CompletedItem, FailedAlbum, FailedBucket, FailedDiscography,
    TrackRecord,
};
use crate::state::{RunState, StageState};
use crate::CrawlError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Summary of one stage run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: StageKind,
    /// Work items the stage was seeded with
    pub seeded: usize,
    /// Seeds skipped because a previous run already finished them
    pub skipped: usize,
    /// Items processed successfully in this run
    pub completed: usize,
    /// Items that failed in this run
    pub failed: usize,
    /// Records obtained in this run
    pub new_records: usize,
    /// Rows in the output file after persisting
    pub total_records: usize,
    pub cancelled: bool,
}

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every requested stage drained its queue
    Completed(Vec<StageReport>),
    /// A stage was cancelled; its partial results were flushed and later
    /// stages did not run
    Cancelled(Vec<StageReport>),
}

impl PipelineOutcome {
    pub fn reports(&self) -> &[StageReport] {
        match self {
            Self::Completed(reports) | Self::Cancelled(reports) => reports,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// What a stage would do, computed without any network access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: StageKind,
    /// `None` if the stage's seed file does not exist yet
    pub seeds: Option<usize>,
    pub already_done: usize,
}

/// Settings shared by every stage of a run
#[derive(Debug, Clone)]
pub struct StageContext {
    pub workers: usize,
    pub courtesy_delay: Duration,
    pub progress: ProgressReporter,
    pub cancel: CancellationToken,
}

/// A stage's output checkpoint, failure file and optional completion ledger
#[derive(Debug)]
pub struct StageFiles<R, F> {
    pub output: CsvCheckpoint<R>,
    pub failures: CsvCheckpoint<F>,
    /// Keys of finished items, for stages whose rows do not name their item
    pub ledger: Option<CsvCheckpoint<CompletedItem>>,
}

impl<R: CheckpointRecord, F: CheckpointRecord> StageFiles<R, F> {
    pub fn new(output: impl Into<PathBuf>, failures: impl Into<PathBuf>) -> Self {
        Self {
            output: CsvCheckpoint::new(output),
            failures: CsvCheckpoint::new(failures),
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, ledger: impl Into<PathBuf>) -> Self {
        self.ledger = Some(CsvCheckpoint::new(ledger));
        self
    }

    /// Loads the prior output rows and the keys of every finished item
    ///
    /// Finished keys come from the output rows the stage can trace back to
    /// their item, plus every key in the ledger.
    pub fn load_processed<S>(&self, stage: &S) -> Result<(HashSet<String>, Vec<R>), CrawlError>
    where
        S: Stage<Record = R, Failure = F>,
    {
        let (mut processed, records) = self.output.load_with_keys(|r| stage.resume_key(r))?;
        if let Some(ledger) = &self.ledger {
            processed.extend(ledger.load()?.into_iter().map(|done| done.key));
        }
        Ok((processed, records))
    }
}

/// Runs one stage to completion or cancellation
///
/// Seeds whose key appears in the output checkpoint or the ledger are
/// skipped. On return the output file holds the prior rows plus every record
/// obtained in this run, the ledger (if any) also lists the items completed
/// in this run, and the failure file holds this run's failures plus prior
/// failures whose item has not completed since.
///
/// Records gathered before a worker panicked are still persisted; the
/// panic is reported afterwards.
pub async fn run_stage<S: Stage>(
    stage: Arc<S>,
    seeds: Vec<WorkItem<S::Item>>,
    files: &StageFiles<S::Record, S::Failure>,
    ctx: &StageContext,
) -> Result<StageReport, CrawlError> {
    let kind = stage.kind();
    let mut state = StageState::Seeding;
    ctx.progress.report(format!("[{}] stage started", kind));

    let (processed, prior_records) = files.load_processed(stage.as_ref())?;
    let prior_failures = files.failures.load()?;

    let seeded = seeds.len();
    let mut queued = HashSet::new();
    let pending: Vec<_> = seeds
        .into_iter()
        .filter(|item| !processed.contains(&item.key) && queued.insert(item.key.clone()))
        .collect();
    let skipped = seeded - pending.len();

    tracing::info!(
        "Stage {}: {} seeds, {} already done, {} to fetch",
        kind,
        seeded,
        skipped,
        pending.len()
    );
    ctx.progress.report(format!(
        "[{}] {} items to fetch, {} already done",
        kind,
        pending.len(),
        skipped
    ));

    let results = Arc::new(RunState::new());
    let pool = WorkerPool::spawn(
        Arc::clone(&stage),
        Arc::clone(&results),
        PoolOptions {
            workers: ctx.workers,
            courtesy_delay: ctx.courtesy_delay,
            total: pending.len(),
        },
        ctx.progress.clone(),
        ctx.cancel.clone(),
    );

    state.transition(StageState::Enqueuing)?;
    for item in pending {
        if !pool.submit(item).await {
            tracing::info!("Stage {} cancelled while enqueuing", kind);
            break;
        }
    }

    state.transition(StageState::Draining)?;
    let drained = pool.finish().await;

    let cancelled = ctx.cancel.is_cancelled();
    state.transition(if cancelled {
        StageState::Flushing
    } else {
        StageState::Persisting
    })?;

    let tally = results.tally();
    let run = results.take();
    let new_records = run.records.len();

    let total_records = files.output.persist(prior_records, run.records)?;
    if let Some(ledger) = &files.ledger {
        let mut completed: Vec<_> = run
            .completed_keys
            .iter()
            .map(|key| CompletedItem { key: key.clone() })
            .collect();
        completed.sort_by(|a, b| a.key.cmp(&b.key));
        let prior = ledger.load()?;
        ledger.persist(prior, completed)?;
    }

    let remaining_failures: Vec<_> = prior_failures
        .into_iter()
        .filter(|failure| !run.completed_keys.contains(&failure.natural_key()))
        .collect();
    let failures = merge_by_key(run.failures, remaining_failures);
    if !failures.is_empty() || files.failures.exists() {
        files.failures.write_all(&failures)?;
    }

    drained?;
    state.transition(StageState::Done)?;

    let report = StageReport {
        stage: kind,
        seeded,
        skipped,
        completed: tally.completed,
        failed: tally.failed,
        new_records,
        total_records,
        cancelled,
    };
    tracing::info!("Stage {} finished: {:?}", kind, report);
    ctx.progress.report(format!(
        "[{}] stage {}: {} completed, {} failed, {} new records, {} total",
        kind,
        if cancelled { "cancelled" } else { "finished" },
        report.completed,
        report.failed,
        report.new_records,
        report.total_records
    ));
    Ok(report)
}

/// Main crawler coordinator structure
#[derive(Debug)]
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    endpoints: Endpoints,
    ctx: StageContext,
}

impl Coordinator {
    /// Creates a coordinator for `config`
    ///
    /// The configuration should already be validated.
    pub fn new(
        config: Config,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<Self, CrawlError> {
        let fetcher = Fetcher::new(&config)?;
        let endpoints = Endpoints::new(&config.upstream.base_url)?;
        let ctx = StageContext {
            workers: config.crawler.worker_count(),
            courtesy_delay: config.crawler.courtesy_delay(),
            progress,
            cancel,
        };

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            endpoints,
            ctx,
        })
    }

    pub fn workers(&self) -> usize {
        self.ctx.workers
    }

    /// Runs the requested stages in pipeline order
    ///
    /// Stops after the first stage that is cancelled.
    pub async fn run(&self, stages: &[StageKind]) -> Result<PipelineOutcome, CrawlError> {
        let mut reports = Vec::new();

        for kind in StageKind::ALL {
            if !stages.contains(&kind) {
                continue;
            }
            if self.ctx.cancel.is_cancelled() {
                return Ok(PipelineOutcome::Cancelled(reports));
            }

            let report = self.run_stage(kind).await?;
            let cancelled = report.cancelled;
            reports.push(report);
            if cancelled {
                return Ok(PipelineOutcome::Cancelled(reports));
            }
        }

        Ok(PipelineOutcome::Completed(reports))
    }

    /// Runs a single stage
    pub async fn run_stage(&self, kind: StageKind) -> Result<StageReport, CrawlError> {
        let output = &self.config.output;
        match kind {
            StageKind::Bands => {
                let stage = Arc::new(self.band_stage());
                run_stage(stage, BandStage::seeds(), &self.band_files(), &self.ctx).await
            }
            StageKind::Albums => {
                let bands = self.load_seed_file::<BandRecord>(kind, output.bands_path())?;
                let seeds = AlbumStage::seeds(&self.endpoints, &bands)?;
                let stage = Arc::new(self.album_stage());
                run_stage(stage, seeds, &self.album_files(), &self.ctx).await
            }
            StageKind::Tracks => {
                let albums = self.load_seed_file::<AlbumRecord>(kind, output.albums_path())?;
                let seeds = TrackStage::seeds(&albums);
                let stage = Arc::new(self.track_stage());
                run_stage(stage, seeds, &self.track_files(), &self.ctx).await
            }
        }
    }

    /// Computes seed and checkpoint counts for each stage without fetching
    pub fn plan(&self, stages: &[StageKind]) -> Result<Vec<StagePlan>, CrawlError> {
        let output = &self.config.output;
        let mut plans = Vec::new();

        for kind in StageKind::ALL {
            if !stages.contains(&kind) {
                continue;
            }
            let plan = match kind {
                StageKind::Bands => {
                    let seeds = BandStage::seeds();
                    let done = count_done(&self.band_stage(), &seeds, &self.band_files())?;
                    StagePlan {
                        stage: kind,
                        seeds: Some(seeds.len()),
                        already_done: done,
                    }
                }
                StageKind::Albums => {
                    let bands = CsvCheckpoint::<BandRecord>::new(output.bands_path());
                    if bands.exists() {
                        let seeds = AlbumStage::seeds(&self.endpoints, &bands.load()?)?;
                        let done = count_done(&self.album_stage(), &seeds, &self.album_files())?;
                        StagePlan {
                            stage: kind,
                            seeds: Some(seeds.len()),
                            already_done: done,
                        }
                    } else {
                        StagePlan {
                            stage: kind,
                            seeds: None,
                            already_done: 0,
                        }
                    }
                }
                StageKind::Tracks => {
                    let albums = CsvCheckpoint::<AlbumRecord>::new(output.albums_path());
                    if albums.exists() {
                        let seeds = TrackStage::seeds(&albums.load()?);
                        let done = count_done(&self.track_stage(), &seeds, &self.track_files())?;
                        StagePlan {
                            stage: kind,
                            seeds: Some(seeds.len()),
                            already_done: done,
                        }
                    } else {
                        StagePlan {
                            stage: kind,
                            seeds: None,
                            already_done: 0,
                        }
                    }
                }
            };
            plans.push(plan);
        }

        Ok(plans)
    }

    fn band_files(&self) -> StageFiles<BandRecord, FailedBucket> {
        let output = &self.config.output;
        StageFiles::new(output.bands_path(), output.failed_buckets_path())
            .with_ledger(output.completed_buckets_path())
    }

    fn album_files(&self) -> StageFiles<AlbumRecord, FailedDiscography> {
        let output = &self.config.output;
        StageFiles::new(output.albums_path(), output.failed_discographies_path())
    }

    fn track_files(&self) -> StageFiles<TrackRecord, FailedAlbum> {
        let output = &self.config.output;
        StageFiles::new(output.tracks_path(), output.failed_albums_path())
    }

    fn band_stage(&self) -> BandStage {
        BandStage::new(ListingClient::new(
            self.fetcher.clone(),
            self.endpoints.clone(),
            self.config.crawler.page_size,
            self.ctx.progress.clone(),
        ))
    }

    fn album_stage(&self) -> AlbumStage {
        AlbumStage::new(self.fetcher.clone(), self.endpoints.clone())
    }

    fn track_stage(&self) -> TrackStage {
        TrackStage::new(self.fetcher.clone())
    }

    fn load_seed_file<R: CheckpointRecord>(
        &self,
        kind: StageKind,
        path: PathBuf,
    ) -> Result<Vec<R>, CrawlError> {
        let checkpoint = CsvCheckpoint::<R>::new(path);
        if !checkpoint.exists() {
            return Err(CrawlError::MissingSeed {
                stage: kind.as_str(),
                path: checkpoint.path().to_path_buf(),
            });
        }
        Ok(checkpoint.load()?)
    }
}

fn count_done<S: Stage>(
    stage: &S,
    seeds: &[WorkItem<S::Item>],
    files: &StageFiles<S::Record, S::Failure>,
) -> Result<usize, CrawlError> {
    let (processed, _) = files.load_processed(stage)?;
    Ok(seeds
        .iter()
        .filter(|item| processed.contains(&item.key))
        .count())
}

/// Runs the requested stages with a fresh coordinator
pub async fn run_pipeline(
    config: Config,
    stages: &[StageKind],
    progress: ProgressReporter,
    cancel: CancellationToken,
) -> Result<PipelineOutcome, CrawlError> {
    let coordinator = Coordinator::new(config, progress, cancel)?;
    coordinator.run(stages).await
}
