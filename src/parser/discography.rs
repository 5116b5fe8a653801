use super::{cell_text, selector, ParseError};
use crate::records::id_from_url;
use scraper::Html;

/// One album row of a band's discography table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscographyEntry {
    pub album_id: String,
    pub album_name: String,
    pub album_type: String,
    pub year: String,
    pub review: String,
    pub album_url: String,
}

/// Parses a discography page
///
/// The first row of the table is a header. Each following row holds an album
/// link, a type cell, a year cell and a review cell. Parsing stops at the
/// first row without an album link, which is how the upstream renders an
/// empty discography.
pub fn parse_discography(html: &str) -> Result<Vec<DiscographyEntry>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;
    let link_selector = selector("a[href]")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or(ParseError::MissingTable("discography"))?;

    let mut entries = Vec::new();
    for (index, row) in table.select(&row_selector).enumerate().skip(1) {
        let cells: Vec<_> = row.select(&cell_selector).collect();

        let Some(link) = cells.first().and_then(|c| c.select(&link_selector).next()) else {
            break;
        };

        if cells.len() < 4 {
            return Err(ParseError::ShortRow {
                index,
                expected: 4,
                found: cells.len(),
            });
        }

        let album_url = link.value().attr("href").unwrap_or_default().to_string();
        entries.push(DiscographyEntry {
            album_id: id_from_url(&album_url),
            album_name: cell_text(&link),
            album_type: cell_text(&cells[1]),
            year: cell_text(&cells[2]),
            review: cell_text(&cells[3]),
            album_url,
        });
    }

    Ok(entries)
}
