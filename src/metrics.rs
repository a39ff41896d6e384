//! Read-only reductions over a normalized [`Table`].
//!
//! The verdict vocabulary is the one the analysis sheet writes: `SEGURO`,
//! `VERIFICAR`, `RIESGOSO` and `FRAUDE`. Any verdict containing one of the
//! three negative labels counts as a threat, and its amount counts toward the
//! protected capital. A record is verified when its confidence is `ALTA`.

use crate::record::Table;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Verdict labels that count as threats, matched as case-insensitive substrings.
pub const NEGATIVE_LABELS: [&str; 3] = ["VERIFICAR", "RIESGOSO", "FRAUDE"];

/// Confidence label that marks a verified record.
pub const HIGH_CONFIDENCE: &str = "ALTA";

pub fn is_negative(verdict: &str) -> bool {
    let upper = verdict.to_uppercase();
    NEGATIVE_LABELS.iter().any(|label| upper.contains(label))
}

pub fn is_high_confidence(confidence: &str) -> bool {
    confidence.trim().eq_ignore_ascii_case(HIGH_CONFIDENCE)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total: usize,
    pub threats: usize,
    pub protected_capital: f64,
    pub verified: usize,
}

pub fn summarize(table: &Table) -> Metrics {
    table.iter().fold(
        Metrics {
            total: table.len(),
            ..Metrics::default()
        },
        |mut m, r| {
            if is_negative(&r.verdict) {
                m.threats += 1;
                m.protected_capital += r.amount;
            }
            if is_high_confidence(&r.confidence) {
                m.verified += 1;
            }
            m
        },
    )
}

/// Number of records sharing a calendar date and verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub verdict: String,
    pub count: usize,
}

/// Records grouped by (date, verdict), oldest date first.
///
/// Records without a date are left out.
pub fn daily_breakdown(table: &Table) -> Vec<DailyCount> {
    let mut groups: BTreeMap<(NaiveDate, &str), usize> = BTreeMap::new();
    for r in table.iter() {
        if let Some(date) = r.date {
            *groups.entry((date, r.verdict.as_str())).or_default() += 1;
        }
    }

    groups
        .into_iter()
        .map(|((date, verdict), count)| DailyCount {
            date,
            verdict: verdict.to_string(),
            count,
        })
        .collect()
}

/// Share of the table carrying one verdict label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerdictShare {
    pub verdict: String,
    pub count: usize,
    pub fraction: f64,
}

/// Verdict proportions, largest first, ties by label.
pub fn verdict_shares(table: &Table) -> Vec<VerdictShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in table.iter() {
        *counts.entry(r.verdict.as_str()).or_default() += 1;
    }

    let total = table.len().max(1) as f64;
    let mut shares: Vec<VerdictShare> = counts
        .into_iter()
        .map(|(verdict, count)| VerdictShare {
            verdict: verdict.to_string(),
            count,
            fraction: count as f64 / total,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.verdict.cmp(&b.verdict)));
    shares
}
