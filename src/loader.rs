use crate::coerce::{parse_amount, parse_date};
use crate::error::{FeedError, Result};
use crate::record::{Column, PLACEHOLDER, Record, Table};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Untyped CSV contents: the header row and every data row as text
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse CSV text into a [`RawTable`]
///
/// Rows may be shorter or longer than the header row; missing trailing cells
/// read as empty. Only a document the CSV reader cannot tokenize at all is an
/// error.
///
/// # Arguments
/// * `text` - Full CSV document, header row first
///
/// # Returns
/// * `Result<RawTable, FeedError>` - The raw table or a `FeedError::Csv`
pub fn read_csv(text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Convert a [`RawTable`] into the canonical [`Table`] shape
///
/// Headers are matched to the expected columns ignoring case, surrounding
/// whitespace and accents. Every expected column that is absent is backfilled
/// with [`PLACEHOLDER`] and listed in [`Table::synthesized`]. No row is ever
/// dropped: dates that do not parse become `None`, amounts that do not parse
/// become `0.0`, and empty text cells become [`PLACEHOLDER`].
///
/// # Arguments
/// * `raw` - Table as read from the feed
///
/// # Returns
/// * `Table` - Normalized records in source order
pub fn normalize(raw: RawTable) -> Table {
    let mut index: HashMap<Column, usize> = HashMap::new();
    for (i, header) in raw.headers.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            index.entry(column).or_insert(i);
        }
    }

    let synthesized: Vec<Column> = Column::ALL
        .into_iter()
        .filter(|c| !index.contains_key(c))
        .collect();
    for column in &synthesized {
        debug!(column = column.header(), "column missing from feed, filling with placeholder");
    }

    let records = raw
        .rows
        .iter()
        .map(|row| {
            let cell = |column: Column| -> Option<String> {
                index
                    .get(&column)
                    .and_then(|&i| row.get(i))
                    .map(|s| clean_str(s))
                    .filter(|s| !s.is_empty())
            };
            let text = |column: Column| cell(column).unwrap_or_else(|| PLACEHOLDER.to_string());

            Record {
                date: cell(Column::Date).as_deref().and_then(parse_date),
                issuer: text(Column::Issuer),
                amount: cell(Column::Amount).as_deref().map_or(0.0, parse_amount),
                verdict: text(Column::Verdict),
                confidence: text(Column::Confidence),
                analysis: text(Column::Analysis),
            }
        })
        .collect();

    Table {
        records,
        synthesized,
    }
}

/// Trim whitespace and strip one pair of outer quotes if present.
fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Read and normalize CSV text in one step
pub fn from_csv_str(text: &str) -> Result<Table> {
    read_csv(text).map(normalize)
}

/// Load a normalized table from a local CSV file
///
/// # Examples
/// ```no_run
/// use escudo::loader::from_csv;
///
/// match from_csv("registros.csv") {
///     Ok(table) => println!("Loaded {} records", table.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Table> {
    let path = filepath.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
        address: path.display().to_string(),
        source,
    })?;
    from_csv_str(&text)
}
