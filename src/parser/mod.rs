//! Page parsers for the three upstream page shapes
//!
//! This module turns a fetched page body into structured rows:
//! - Band listing JSON pages (`browse/ajax-letter`)
//! - Band discography tables
//! - Album tracklist tables
//!
//! A page that does not have the expected shape is a [`ParseError`]; callers
//! record it as a permanent failure and never retry it.

mod discography;
mod listing;
mod tracklist;

pub use discography::{parse_discography, DiscographyEntry};
pub use listing::{parse_band_row, parse_listing_page, ListingPage};
pub use tracklist::{parse_tracklist, TrackEntry};

use scraper::{ElementRef, Selector};
use thiserror::Error;

/// Errors raised when a page does not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid listing JSON: {0}")]
    Json(String),

    #[error("Listing field missing or invalid: {0}")]
    MissingField(&'static str),

    #[error("Unexpected band row: {0}")]
    BandRow(String),

    #[error("No {0} table found on page")]
    MissingTable(&'static str),

    #[error("Unexpected table row {index}: expected {expected} cells, found {found}")]
    ShortRow {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid selector: {0}")]
    Selector(&'static str),
}

/// Compiles a CSS selector
fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css))
}

/// Collects an element's text content, trimmed
fn cell_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
