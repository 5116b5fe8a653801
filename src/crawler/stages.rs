//! The bands, albums and tracks stages
//!
//! Each stage turns one kind of work item into records:
//! - [`BandStage`]: a listing bucket into band rows
//! - [`AlbumStage`]: a band's discography page into album rows
//! - [`TrackStage`]: an album page into track rows

use super::endpoints::Endpoints;
use super::fetcher::{FetchOutcome, Fetcher, Pacer};
use super::listing::ListingClient;
use super::queue::WorkItem;
use super::stage::{Stage, StageKind};
use crate::parser::{parse_discography, parse_tracklist};
use crate::records::{
    AlbumRecord, BandRecord, FailedAlbum, FailedBucket, FailedDiscography, TrackRecord, BUCKETS,
};
use crate::state::ItemOutcome;

// ===== Bands =====

/// Downloads whole listing buckets
#[derive(Debug, Clone)]
pub struct BandStage {
    listing: ListingClient,
}

impl BandStage {
    pub fn new(listing: ListingClient) -> Self {
        Self { listing }
    }

    /// One work item per bucket, labelled with the bucket name
    pub fn seeds() -> Vec<WorkItem<String>> {
        BUCKETS
            .iter()
            .map(|bucket| WorkItem::with_priority(*bucket, *bucket, bucket.to_string()))
            .collect()
    }
}

impl Stage for BandStage {
    type Item = String;
    type Record = BandRecord;
    type Failure = FailedBucket;

    fn kind(&self) -> StageKind {
        StageKind::Bands
    }

    // A band row does not say which bucket listed it; finished buckets are
    // kept in the completion ledger instead.
    fn resume_key(&self, _record: &BandRecord) -> Option<String> {
        None
    }

    async fn process(
        &self,
        item: WorkItem<String>,
        pacer: &mut Pacer,
    ) -> ItemOutcome<BandRecord, FailedBucket> {
        match self.listing.fetch_bucket(&item.payload, pacer).await {
            Ok(listing) => ItemOutcome::Completed(listing.rows),
            Err(e) => {
                tracing::error!("Bucket {} failed: {}", item.payload, e);
                ItemOutcome::Failed(FailedBucket {
                    bucket: item.payload,
                    reason: e.to_string(),
                })
            }
        }
    }
}

// ===== Albums =====

/// A band whose discography should be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandRef {
    pub band_id: String,
    pub band_name: String,
    pub discography_url: String,
}

/// Downloads band discography pages
#[derive(Debug, Clone)]
pub struct AlbumStage {
    fetcher: Fetcher,
    endpoints: Endpoints,
}

impl AlbumStage {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// One work item per band, keyed by its discography URL
    pub fn seeds(
        endpoints: &Endpoints,
        bands: &[BandRecord],
    ) -> Result<Vec<WorkItem<BandRef>>, url::ParseError> {
        bands
            .iter()
            .map(|band| {
                let discography_url = endpoints.discography(&band.metallum_band_id)?.to_string();
                Ok(WorkItem::new(
                    discography_url.clone(),
                    BandRef {
                        band_id: band.metallum_band_id.clone(),
                        band_name: band.name.clone(),
                        discography_url,
                    },
                ))
            })
            .collect()
    }
}

impl Stage for AlbumStage {
    type Item = BandRef;
    type Record = AlbumRecord;
    type Failure = FailedDiscography;

    fn kind(&self) -> StageKind {
        StageKind::Albums
    }

    fn resume_key(&self, record: &AlbumRecord) -> Option<String> {
        self.endpoints
            .discography(&record.metallum_band_id)
            .ok()
            .map(|url| url.to_string())
    }

    async fn process(
        &self,
        item: WorkItem<BandRef>,
        pacer: &mut Pacer,
    ) -> ItemOutcome<AlbumRecord, FailedDiscography> {
        let band = item.payload;
        pacer.wait().await;

        let reason = match self.fetcher.fetch(&band.discography_url).await {
            FetchOutcome::Success(html) => match parse_discography(&html) {
                Ok(entries) => {
                    let albums = entries
                        .into_iter()
                        .map(|entry| AlbumRecord {
                            metallum_band_id: band.band_id.clone(),
                            band_name: band.band_name.clone(),
                            metallum_album_id: entry.album_id,
                            album_name: entry.album_name,
                            album_type: entry.album_type,
                            year: entry.year,
                            review: entry.review,
                            album_url: entry.album_url,
                        })
                        .collect();
                    return ItemOutcome::Completed(albums);
                }
                Err(e) => e.to_string(),
            },
            FetchOutcome::TransientFailure(reason) | FetchOutcome::PermanentFailure(reason) => {
                reason.to_string()
            }
        };

        tracing::warn!(
            "Discography of {} ({}) failed: {}",
            band.band_name,
            band.band_id,
            reason
        );
        ItemOutcome::Failed(FailedDiscography {
            metallum_band_id: band.band_id,
            band_name: band.band_name,
            discography_url: band.discography_url,
        })
    }
}

// ===== Tracks =====

/// An album whose tracklist should be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRef {
    pub band_id: String,
    pub band_name: String,
    pub album_id: String,
    pub album_name: String,
    pub album_url: String,
}

/// Downloads album pages
#[derive(Debug, Clone)]
pub struct TrackStage {
    fetcher: Fetcher,
}

impl TrackStage {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// One work item per album, keyed by its URL
    pub fn seeds(albums: &[AlbumRecord]) -> Vec<WorkItem<AlbumRef>> {
        albums
            .iter()
            .map(|album| {
                WorkItem::new(
                    album.album_url.clone(),
                    AlbumRef {
                        band_id: album.metallum_band_id.clone(),
                        band_name: album.band_name.clone(),
                        album_id: album.metallum_album_id.clone(),
                        album_name: album.album_name.clone(),
                        album_url: album.album_url.clone(),
                    },
                )
            })
            .collect()
    }
}

impl Stage for TrackStage {
    type Item = AlbumRef;
    type Record = TrackRecord;
    type Failure = FailedAlbum;

    fn kind(&self) -> StageKind {
        StageKind::Tracks
    }

    fn resume_key(&self, record: &TrackRecord) -> Option<String> {
        Some(record.album_url.clone())
    }

    async fn process(
        &self,
        item: WorkItem<AlbumRef>,
        pacer: &mut Pacer,
    ) -> ItemOutcome<TrackRecord, FailedAlbum> {
        let album = item.payload;
        pacer.wait().await;

        let reason = match self.fetcher.fetch(&album.album_url).await {
            FetchOutcome::Success(html) => match parse_tracklist(&html) {
                Ok(entries) => {
                    let tracks = entries
                        .into_iter()
                        .map(|track| TrackRecord {
                            metallum_band_id: album.band_id.clone(),
                            band_name: album.band_name.clone(),
                            metallum_album_id: album.album_id.clone(),
                            album_name: album.album_name.clone(),
                            album_url: album.album_url.clone(),
                            track_name: track.name,
                            track_number: track.number,
                            track_length: track.length,
                        })
                        .collect();
                    return ItemOutcome::Completed(tracks);
                }
                Err(e) => e.to_string(),
            },
            FetchOutcome::TransientFailure(reason) | FetchOutcome::PermanentFailure(reason) => {
                reason.to_string()
            }
        };

        tracing::warn!("Album {} failed: {}", album.album_url, reason);
        ItemOutcome::Failed(FailedAlbum {
            metallum_band_id: album.band_id,
            band_name: album.band_name,
            album_id: album.album_id,
            album_name: album.album_name,
            album_url: album.album_url,
        })
    }
}
