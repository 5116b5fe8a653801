use super::{cell_text, selector, ParseError};
use scraper::Html;

/// One track row of an album page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub number: String,
    pub name: String,
    pub length: String,
}

/// Parses the tracklist of an album page
///
/// Tracks live in `table.display.table_lyrics`, one `tr.even`/`tr.odd` row
/// per track with number, name and length cells. Other rows (lyrics, disc
/// headers, the total length) are ignored.
pub fn parse_tracklist(html: &str) -> Result<Vec<TrackEntry>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = selector("table.display.table_lyrics")?;
    let row_selector = selector("tr.even, tr.odd")?;
    let cell_selector = selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or(ParseError::MissingTable("tracklist"))?;

    table
        .select(&row_selector)
        .enumerate()
        .map(|(index, row)| {
            let cells: Vec<String> = row.select(&cell_selector).map(|c| cell_text(&c)).collect();
            if cells.len() < 3 {
                return Err(ParseError::ShortRow {
                    index,
                    expected: 3,
                    found: cells.len(),
                });
            }

            Ok(TrackEntry {
                number: cells[0].strip_suffix('.').unwrap_or(cells[0].as_str()).to_string(),
                name: cells[1].split_whitespace().collect::<Vec<_>>().join(" "),
                length: cells[2].clone(),
            })
        })
        .collect()
}
