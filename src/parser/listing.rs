use super::{cell_text, selector, ParseError};
use crate::records::{id_from_url, BandRecord};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

/// One page of the band listing endpoint
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// Total number of rows in the bucket, across all pages
    pub total_records: usize,

    /// The rows on this page, in upstream order
    pub rows: Vec<BandRecord>,
}

#[derive(Debug, Deserialize)]
struct RawListingPage {
    #[serde(rename = "iTotalRecords")]
    total_records: Value,
    #[serde(rename = "aaData")]
    data: Vec<Vec<String>>,
}

/// Parses a listing JSON body
///
/// The body has the shape
/// `{"iTotalRecords": 1200, "aaData": [[link, country, genre, status], ...]}`
/// where `link` and `status` are small HTML fragments.
pub fn parse_listing_page(body: &str) -> Result<ListingPage, ParseError> {
    let raw: RawListingPage =
        serde_json::from_str(body).map_err(|e| ParseError::Json(e.to_string()))?;

    // The count is usually a number but older responses send it as a string
    let total_records = match &raw.total_records {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or(ParseError::MissingField("iTotalRecords"))? as usize;

    let rows = raw
        .data
        .iter()
        .map(|row| parse_band_row(row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ListingPage {
        total_records,
        rows,
    })
}

/// Parses one listing row into a band record
///
/// `<a href='https://host/bands/Name/123'>Name</a>` supplies the URL, name and
/// ID; `<span class="active">Active</span>` supplies the status.
pub fn parse_band_row(row: &[String]) -> Result<BandRecord, ParseError> {
    let [link, country, genre, status] = row else {
        return Err(ParseError::BandRow(format!(
            "expected 4 columns, found {}",
            row.len()
        )));
    };

    let link_fragment = Html::parse_fragment(link);
    let anchor_selector = selector("a[href]")?;
    let anchor = link_fragment
        .select(&anchor_selector)
        .next()
        .ok_or_else(|| ParseError::BandRow(format!("no band link in {:?}", link)))?;

    let url = anchor.value().attr("href").unwrap_or_default().to_string();
    let name = cell_text(&anchor);
    let band_id = id_from_url(&url);
    if band_id.is_empty() || name.is_empty() {
        return Err(ParseError::BandRow(format!("incomplete band link {:?}", link)));
    }

    let status_fragment = Html::parse_fragment(status);
    let span_selector = selector("span")?;
    let status = status_fragment
        .select(&span_selector)
        .next()
        .map(|span| cell_text(&span))
        .unwrap_or_else(|| cell_text(&status_fragment.root_element()));

    Ok(BandRecord {
        metallum_band_id: band_id,
        name,
        genre: genre.trim().to_string(),
        country: country.trim().to_string(),
        status,
        url,
    })
}
