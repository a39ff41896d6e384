use crate::feed::FeedLoader;
use crate::metrics::{self, DailyCount, Metrics, VerdictShare};
use crate::record::{Record, Table, TableSort};
use crate::style::{format_currency, format_date, verdict_cell_style, verdict_swatch};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info_span, Instrument};

pub const NO_DATA_WARNING: &str =
    "No se encontraron datos. Verifica que el enlace CSV sea correcto y tenga datos.";
pub const NO_DATA_HINT: &str =
    "El link debe verse similar a: https://docs.google.com/spreadsheets/d/e/.../pub?output=csv";

/// Everything the page needs for one refresh cycle.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderModel {
    NoData(NoData),
    HasData(Box<Report>),
}

impl RenderModel {
    pub fn has_data(&self) -> bool {
        matches!(self, RenderModel::HasData(_))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NoData {
    pub warning: String,
    pub hint: String,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub metrics: Metrics,
    pub tiles: Vec<MetricTile>,
    pub daily: Vec<DailyCount>,
    pub shares: Vec<VerdictShare>,
    pub rows: Vec<StyledRow>,
    pub sort: TableSort,
    pub generated_at: DateTime<Utc>,
    pub from_cache: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricTile {
    pub label: &'static str,
    pub value: String,
}

/// A detail-table row, formatted and coloured
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StyledRow {
    pub date: String,
    pub issuer: String,
    pub amount: String,
    pub amount_value: f64,
    pub verdict: String,
    pub verdict_color: &'static str,
    pub verdict_style: String,
    pub confidence: String,
    pub analysis: String,
}

impl From<&Record> for StyledRow {
    fn from(r: &Record) -> Self {
        Self {
            date: format_date(r.date),
            issuer: r.issuer.clone(),
            amount: format_currency(r.amount),
            amount_value: r.amount,
            verdict: r.verdict.clone(),
            verdict_color: verdict_swatch(&r.verdict).hex,
            verdict_style: verdict_cell_style(&r.verdict),
            confidence: r.confidence.clone(),
            analysis: r.analysis.clone(),
        }
    }
}

/// Build the render model for a table.
///
/// An empty table yields [`RenderModel::NoData`] and nothing is computed.
pub fn present(table: &Table, sort: TableSort, generated_at: DateTime<Utc>) -> RenderModel {
    if table.is_empty() {
        return RenderModel::NoData(NoData {
            warning: NO_DATA_WARNING.to_string(),
            hint: NO_DATA_HINT.to_string(),
            error: None,
        });
    }

    let metrics = metrics::summarize(table);
    let tiles = vec![
        MetricTile {
            label: "Docs Analizados",
            value: metrics.total.to_string(),
        },
        MetricTile {
            label: "Amenazas Detectadas",
            value: metrics.threats.to_string(),
        },
        MetricTile {
            label: "Capital Protegido",
            value: format_currency(metrics.protected_capital),
        },
        MetricTile {
            label: "Verificados",
            value: metrics.verified.to_string(),
        },
    ];

    RenderModel::HasData(Box::new(Report {
        tiles,
        metrics,
        daily: metrics::daily_breakdown(table),
        shares: metrics::verdict_shares(table),
        rows: table.sorted(sort).into_iter().map(StyledRow::from).collect(),
        sort,
        generated_at,
        from_cache: false,
    }))
}

/// Fetch → normalize → present, one cycle per call.
///
/// The loader sits behind an async mutex so cycles never overlap and at most
/// one fetch is in flight.
pub struct Dashboard {
    loader: Mutex<FeedLoader>,
}

impl Dashboard {
    pub fn new(loader: FeedLoader) -> Self {
        Self {
            loader: Mutex::new(loader),
        }
    }

    pub async fn run_cycle(&self, sort: TableSort) -> RenderModel {
        let mut loader = self.loader.lock().await;
        let span = info_span!("cycle", feed = %loader.address());
        let outcome = loader.load().instrument(span).await;
        drop(loader);

        let mut model = present(&outcome.table, sort, outcome.fetched_at);
        match &mut model {
            RenderModel::NoData(no_data) => no_data.error = outcome.error,
            RenderModel::HasData(report) => report.from_cache = outcome.from_cache,
        }
        debug!(has_data = model.has_data(), "cycle rendered");
        model
    }

    /// Current table through the same cache, without rendering it.
    pub async fn snapshot(&self) -> std::sync::Arc<Table> {
        self.loader.lock().await.load().await.table
    }
}
