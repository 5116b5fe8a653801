use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on the worker count, to respect upstream load limits
pub const MAX_WORKERS: usize = 32;

/// Main configuration structure for Metallum-Crawl
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub upstream: UpstreamConfig,
    pub output: OutputConfig,
    pub progress: ProgressConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers (defaults to the available parallelism)
    pub workers: Option<usize>,

    /// Attempt budget for network errors and for paginated listing pages
    pub max_attempts: u32,

    /// Fixed wait between attempts after a network error (seconds)
    pub network_backoff_secs: u64,

    /// Status code the upstream uses to signal it is overloaded
    pub overload_status: u16,

    /// Cooldown before the single retry of an overloaded request (seconds)
    pub overload_cooldown_secs: u64,

    /// Minimum time between consecutive requests of one fetch sequence (milliseconds)
    pub courtesy_delay_ms: u64,

    /// Rows requested per listing page
    pub page_size: usize,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_attempts: 3,
            network_backoff_secs: 120,
            overload_status: 520,
            overload_cooldown_secs: 15,
            courtesy_delay_ms: 1000,
            page_size: 500,
            request_timeout_secs: 60,
        }
    }
}

impl CrawlerConfig {
    /// Resolves the worker count: the configured value, or the machine's
    /// available parallelism, capped at [`MAX_WORKERS`]
    pub fn worker_count(&self) -> usize {
        let hint = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        hint.clamp(1, MAX_WORKERS)
    }

    pub fn network_backoff(&self) -> Duration {
        Duration::from_secs(self.network_backoff_secs)
    }

    pub fn overload_cooldown(&self) -> Duration {
        Duration::from_secs(self.overload_cooldown_secs)
    }

    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_millis(self.courtesy_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Upstream site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UpstreamConfig {
    /// Scheme and host every endpoint is built from
    pub base_url: String,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.metal-archives.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:78.0) \
                         Gecko/20100101 Firefox/78.0"
                .to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory all checkpoint files live in
    pub directory: PathBuf,

    pub bands_file: String,
    pub albums_file: String,
    pub tracks_file: String,
    pub failed_buckets_file: String,
    pub failed_discographies_file: String,
    pub failed_albums_file: String,

    /// Listing buckets that were downloaded completely
    pub completed_buckets_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            bands_file: "bands.csv".to_string(),
            albums_file: "albums.csv".to_string(),
            tracks_file: "tracks.csv".to_string(),
            failed_buckets_file: "failed_buckets.csv".to_string(),
            failed_discographies_file: "failed_discographies.csv".to_string(),
            failed_albums_file: "failed_album_urls.csv".to_string(),
            completed_buckets_file: "completed_buckets.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn bands_path(&self) -> PathBuf {
        self.directory.join(&self.bands_file)
    }

    pub fn albums_path(&self) -> PathBuf {
        self.directory.join(&self.albums_file)
    }

    pub fn tracks_path(&self) -> PathBuf {
        self.directory.join(&self.tracks_file)
    }

    pub fn failed_buckets_path(&self) -> PathBuf {
        self.directory.join(&self.failed_buckets_file)
    }

    pub fn failed_discographies_path(&self) -> PathBuf {
        self.directory.join(&self.failed_discographies_file)
    }

    pub fn failed_albums_path(&self) -> PathBuf {
        self.directory.join(&self.failed_albums_file)
    }

    pub fn completed_buckets_path(&self) -> PathBuf {
        self.directory.join(&self.completed_buckets_file)
    }
}

/// Progress reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProgressConfig {
    /// Disable to suppress all progress lines (headless runs)
    pub enabled: bool,

    /// Echo progress lines to standard output
    pub stdout: bool,

    /// Append progress lines to this file
    pub log_file: Option<PathBuf>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stdout: true,
            log_file: None,
        }
    }
}
