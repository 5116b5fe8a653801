//! Paginated download of one band listing bucket

use super::endpoints::Endpoints;
use super::fetcher::{FailureReason, FetchOutcome, Fetcher, Pacer};
use crate::parser::{parse_listing_page, ParseError};
use crate::progress::ProgressReporter;
use crate::records::BandRecord;
use thiserror::Error;

/// Reasons a bucket could not be downloaded completely
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("bucket {bucket}: request at offset {offset} failed permanently: {reason}")]
    Fetch {
        bucket: String,
        offset: usize,
        reason: FailureReason,
    },

    #[error("bucket {bucket}: unreadable page at offset {offset}: {source}")]
    Parse {
        bucket: String,
        offset: usize,
        #[source]
        source: ParseError,
    },

    #[error("bucket {bucket}: gave up at offset {offset} after {attempts} failed requests ({last})")]
    AttemptsExhausted {
        bucket: String,
        offset: usize,
        attempts: u32,
        last: FailureReason,
    },

    #[error("bucket {bucket}: {source}")]
    Url {
        bucket: String,
        #[source]
        source: url::ParseError,
    },
}

/// Every row of one bucket
#[derive(Debug, Clone)]
pub struct BucketListing {
    pub bucket: String,
    /// Total the upstream reported on the first page
    pub total_records: usize,
    /// Number of pages that were fetched successfully
    pub pages: usize,
    pub rows: Vec<BandRecord>,
}

/// Downloads listing buckets page by page
#[derive(Debug, Clone)]
pub struct ListingClient {
    fetcher: Fetcher,
    endpoints: Endpoints,
    page_size: usize,
    progress: ProgressReporter,
}

impl ListingClient {
    pub fn new(
        fetcher: Fetcher,
        endpoints: Endpoints,
        page_size: usize,
        progress: ProgressReporter,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            page_size: page_size.max(1),
            progress,
        }
    }

    /// Fetches every page of `bucket`
    ///
    /// The first page reports the bucket total; pages are then requested at
    /// increasing offsets until the offset reaches it. Every request is a
    /// single attempt. A page that fails transiently is requested again at
    /// the same offset, after the overload cooldown if the upstream reported
    /// overload and after the network backoff otherwise. The bucket shares
    /// one budget of `max_attempts` failed requests across all of its pages;
    /// spending it, or a second overload, fails the bucket.
    pub async fn fetch_bucket(
        &self,
        bucket: &str,
        pacer: &mut Pacer,
    ) -> Result<BucketListing, ListingError> {
        let policy = *self.fetcher.policy();
        let mut failed_requests = 0u32;
        let mut overload_retried = false;
        let mut total: Option<usize> = None;
        let mut offset = 0usize;
        let mut pages = 0usize;
        let mut rows = Vec::new();

        loop {
            if let Some(total) = total {
                if offset >= total {
                    break;
                }
            }

            let url = self
                .endpoints
                .listing(bucket, offset, self.page_size)
                .map_err(|source| ListingError::Url {
                    bucket: bucket.to_string(),
                    source,
                })?;

            match total {
                Some(total) => self.progress.report(format!(
                    "[{}]: downloading {}-{} of {}",
                    bucket,
                    offset,
                    (offset + self.page_size).min(total),
                    total
                )),
                None => self
                    .progress
                    .report(format!("[{}]: downloading first page", bucket)),
            }

            pacer.wait().await;
            match self.fetcher.fetch_once(url.as_str()).await {
                FetchOutcome::Success(body) => {
                    let page = parse_listing_page(&body).map_err(|source| ListingError::Parse {
                        bucket: bucket.to_string(),
                        offset,
                        source,
                    })?;
                    if total.is_none() {
                        tracing::debug!("Bucket {} holds {} bands", bucket, page.total_records);
                        total = Some(page.total_records);
                    }
                    rows.extend(page.rows);
                    pages += 1;
                    offset += self.page_size;
                }
                FetchOutcome::TransientFailure(reason) => {
                    failed_requests += 1;
                    let overloaded = reason == FailureReason::Status(policy.overload_status);
                    if failed_requests >= policy.max_attempts || (overloaded && overload_retried) {
                        return Err(ListingError::AttemptsExhausted {
                            bucket: bucket.to_string(),
                            offset,
                            attempts: failed_requests,
                            last: reason,
                        });
                    }

                    let wait = if overloaded {
                        overload_retried = true;
                        policy.overload_cooldown
                    } else {
                        policy.network_backoff
                    };
                    tracing::warn!(
                        "Bucket {} page at offset {} failed ({}), retrying in {:?}",
                        bucket,
                        offset,
                        reason,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                FetchOutcome::PermanentFailure(reason) => {
                    return Err(ListingError::Fetch {
                        bucket: bucket.to_string(),
                        offset,
                        reason,
                    });
                }
            }
        }

        let total_records = total.unwrap_or_default();
        self.progress.report(format!(
            "[{}]: finished, {} bands in {} pages",
            bucket,
            rows.len(),
            pages
        ));
        Ok(BucketListing {
            bucket: bucket.to_string(),
            total_records,
            pages,
            rows,
        })
    }
}
