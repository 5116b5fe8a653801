//! Record types persisted by the crawl stages
//!
//! Field names match the CSV column headers of the checkpoint files.

use crate::checkpoint::CheckpointRecord;
use serde::{Deserialize, Serialize};

/// Listing buckets: one per letter, plus numeric- and symbol-leading names
pub const BUCKETS: [&str; 28] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z", "NBR", "~",
];

/// Returns the last path segment of an upstream URL, which is its numeric ID
pub fn id_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// A band row from `bands.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRecord {
    pub metallum_band_id: String,
    pub name: String,
    pub genre: String,
    pub country: String,
    pub status: String,
    pub url: String,
}

impl CheckpointRecord for BandRecord {
    fn natural_key(&self) -> String {
        self.metallum_band_id.clone()
    }
}

/// An album row from `albums.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub metallum_band_id: String,
    pub band_name: String,
    pub metallum_album_id: String,
    pub album_name: String,
    pub album_type: String,
    pub year: String,
    pub review: String,
    pub album_url: String,
}

impl CheckpointRecord for AlbumRecord {
    fn natural_key(&self) -> String {
        self.metallum_album_id.clone()
    }
}

/// A track row from `tracks.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub metallum_band_id: String,
    pub band_name: String,
    pub metallum_album_id: String,
    pub album_name: String,
    pub album_url: String,
    pub track_name: String,
    pub track_number: String,
    pub track_length: String,
}

impl CheckpointRecord for TrackRecord {
    // Albums are fetched wholesale, so a track is identified by its position
    // within the album page it came from.
    fn natural_key(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.album_url, self.track_number, self.track_name
        )
    }
}

/// A work item that finished, for stages whose rows do not identify the item
/// they came from (`completed_buckets.csv`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedItem {
    pub key: String,
}

impl CheckpointRecord for CompletedItem {
    fn natural_key(&self) -> String {
        self.key.clone()
    }
}

/// A listing bucket that could not be downloaded completely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBucket {
    pub bucket: String,
    pub reason: String,
}

impl CheckpointRecord for FailedBucket {
    fn natural_key(&self) -> String {
        self.bucket.clone()
    }
}

/// A discography page that could not be fetched or parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDiscography {
    pub metallum_band_id: String,
    pub band_name: String,
    pub discography_url: String,
}

impl CheckpointRecord for FailedDiscography {
    fn natural_key(&self) -> String {
        self.discography_url.clone()
    }
}

/// An album page that could not be fetched or parsed (`failed_album_urls.csv`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAlbum {
    pub metallum_band_id: String,
    pub band_name: String,
    pub album_id: String,
    pub album_name: String,
    pub album_url: String,
}

impl CheckpointRecord for FailedAlbum {
    fn natural_key(&self) -> String {
        self.album_url.clone()
    }
}
