//! Total per-field coercions: bad input degrades to a default instead of
//! failing the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Leading group has no leading zero; every later group is exactly three digits.
    static ref DOT_GROUPED: Regex = Regex::new(r"^-?[1-9][0-9]{0,2}(\.[0-9]{3})+(,[0-9]+)?$").unwrap();
    static ref COMMA_GROUPED: Regex = Regex::new(r"^-?[1-9][0-9]{0,2}(,[0-9]{3})+(\.[0-9]+)?$").unwrap();
}

// Tried in order; day-first wins over month-first for slashed dates.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%m/%d/%Y",
];

/// Parse a monetary cell, returning `0.0` for anything that is not a finite
/// number.
///
/// Currency symbols and whitespace are ignored. A separator is read as a
/// thousands separator only when the number is well grouped: a leading group
/// of one to three digits (no leading zero) followed by groups of exactly
/// three. So `$ 1.500` and `1,500` are fifteen hundred while `1500.75`,
/// `0.125` and `1,5` keep their decimals. With both separators present the
/// grouped one must come first and the other one is the decimal. Malformed
/// grouping such as `1,234,5` is not a number.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '+'))
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    let normalized = match (dots, commas) {
        (0, 0) => cleaned,
        _ if DOT_GROUPED.is_match(&cleaned) => ungroup(&cleaned, '.', ','),
        _ if COMMA_GROUPED.is_match(&cleaned) => ungroup(&cleaned, ',', '.'),
        // A lone separator that does not group thousands is a decimal mark.
        (1, 0) => cleaned,
        (0, 1) => cleaned.replace(',', "."),
        _ => return 0.0,
    };

    finite_or_zero(normalized.parse::<f64>().ok())
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Rewrite a grouped number into the `1234.56` form `f64::from_str` accepts.
fn ungroup(s: &str, thousands: char, decimal: char) -> String {
    s.chars()
        .filter(|&c| c != thousands)
        .map(|c| if c == decimal { '.' } else { c })
        .collect()
}

/// Parse a date cell, returning `None` when no known layout matches.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        })
}
