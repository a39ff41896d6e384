use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Value written into every cell of a column the feed did not provide.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Date,
    Issuer,
    Amount,
    Verdict,
    Analysis,
    Confidence,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Date,
        Column::Issuer,
        Column::Amount,
        Column::Verdict,
        Column::Analysis,
        Column::Confidence,
    ];

    /// Header as it appears in the published sheet
    pub fn header(self) -> &'static str {
        match self {
            Column::Date => "Fecha",
            Column::Issuer => "Emisor",
            Column::Amount => "Monto",
            Column::Verdict => "Veredicto",
            Column::Analysis => "Analisis",
            Column::Confidence => "Confianza",
        }
    }

    /// Query-string name, as accepted by `?sort=`
    pub fn key(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Issuer => "issuer",
            Column::Amount => "amount",
            Column::Verdict => "verdict",
            Column::Analysis => "analysis",
            Column::Confidence => "confidence",
        }
    }

    // Keys are already lower-cased and accent-folded.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Date => &["fecha", "date"],
            Column::Issuer => &["emisor", "issuer"],
            Column::Amount => &["monto", "amount"],
            Column::Verdict => &["veredicto", "verdict"],
            Column::Analysis => &["analisis", "analysis"],
            Column::Confidence => &["confianza", "confidence"],
        }
    }

    /// Resolves a raw CSV header to an expected column.
    ///
    /// Matching ignores surrounding whitespace, case and Spanish accents, so
    /// `" Análisis "` and `"ANALISIS"` both resolve to [`Column::Analysis`].
    pub fn from_header(raw: &str) -> Option<Column> {
        let key = canonical_key(raw);
        Column::ALL
            .into_iter()
            .find(|column| column.aliases().contains(&key.as_str()))
    }
}

/// Trim, drop a BOM, lower-case and fold accents.
pub fn canonical_key(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// One analysed document from the feed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub date: Option<NaiveDate>,
    pub issuer: String,
    pub amount: f64,
    pub verdict: String,
    pub confidence: String,
    pub analysis: String,
}

impl Record {
    /// Display text for a column, `N/A` for a missing date.
    pub fn text(&self, column: Column) -> String {
        match column {
            Column::Date => self
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            Column::Issuer => self.issuer.clone(),
            Column::Amount => self.amount.to_string(),
            Column::Verdict => self.verdict.clone(),
            Column::Analysis => self.analysis.clone(),
            Column::Confidence => self.confidence.clone(),
        }
    }
}

/// One fetch cycle's worth of records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    pub records: Vec<Record>,
    /// Expected columns that were absent from the source and backfilled
    pub synthesized: Vec<Column>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Records ordered for the detail view.
    ///
    /// Sorting is stable; records without a date always go last when sorting
    /// by date, whatever the direction.
    pub fn sorted(&self, sort: TableSort) -> Vec<&Record> {
        let mut rows: Vec<&Record> = self.records.iter().collect();
        rows.sort_by(|a, b| sort.compare(a, b));
        rows
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn key(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Column and direction of the detail table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSort {
    pub column: Column,
    pub order: SortOrder,
}

impl Default for TableSort {
    fn default() -> Self {
        Self {
            column: Column::Date,
            order: SortOrder::Desc,
        }
    }
}

impl TableSort {
    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        if self.column == Column::Date {
            return match (a.date, b.date) {
                (Some(x), Some(y)) => self.directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
        }

        let ord = match self.column {
            Column::Amount => a.amount.total_cmp(&b.amount),
            column => canonical_key(&a.text(column)).cmp(&canonical_key(&b.text(column))),
        };
        self.directed(ord)
    }

    fn directed(&self, ord: Ordering) -> Ordering {
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: Option<(i32, u32, u32)>, issuer: &str, amount: f64) -> Record {
        Record {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            issuer: issuer.to_string(),
            amount,
            verdict: "SEGURO".to_string(),
            confidence: "ALTA".to_string(),
            analysis: PLACEHOLDER.to_string(),
        }
    }

    #[test]
    fn headers_resolve_regardless_of_case_space_and_accents() {
        assert_eq!(Column::from_header(" Fecha "), Some(Column::Date));
        assert_eq!(Column::from_header("MONTO"), Some(Column::Amount));
        assert_eq!(Column::from_header("Análisis"), Some(Column::Analysis));
        assert_eq!(Column::from_header("\u{feff}Emisor"), Some(Column::Issuer));
        assert_eq!(Column::from_header("verdict"), Some(Column::Verdict));
        assert_eq!(Column::from_header("Confidence"), Some(Column::Confidence));
        assert_eq!(Column::from_header("Comentario"), None);
    }

    #[test]
    fn default_sort_is_most_recent_first_with_undated_last() {
        let table = Table {
            records: vec![
                record(None, "sin fecha", 1.0),
                record(Some((2024, 1, 1)), "viejo", 2.0),
                record(Some((2024, 3, 1)), "nuevo", 3.0),
            ],
            synthesized: Vec::new(),
        };

        let issuers: Vec<&str> = table
            .sorted(TableSort::default())
            .iter()
            .map(|r| r.issuer.as_str())
            .collect();
        assert_eq!(issuers, vec!["nuevo", "viejo", "sin fecha"]);

        let asc = TableSort {
            column: Column::Date,
            order: SortOrder::Asc,
        };
        let issuers: Vec<&str> = table.sorted(asc).iter().map(|r| r.issuer.as_str()).collect();
        assert_eq!(issuers, vec!["viejo", "nuevo", "sin fecha"]);
    }

    #[test]
    fn amount_sort_is_numeric() {
        let table = Table {
            records: vec![
                record(None, "a", 900.0),
                record(None, "b", 10_000.0),
                record(None, "c", 50.0),
            ],
            synthesized: Vec::new(),
        };
        let sort = TableSort {
            column: Column::Amount,
            order: SortOrder::Desc,
        };
        let issuers: Vec<&str> = table.sorted(sort).iter().map(|r| r.issuer.as_str()).collect();
        assert_eq!(issuers, vec!["b", "a", "c"]);
    }
}
