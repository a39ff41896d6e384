use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use handlebars::Handlebars;
use serde::Deserialize;
use serde_json::{Value, json};
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::dashboard::{Dashboard, RenderModel};
use crate::downloader;
use crate::feed::{self, FeedLoader};
use crate::graph::{self, ChartOptions};
use crate::record::{Column, SortOrder, TableSort};

const PAGE_TEMPLATE: &str = "dashboard";

pub struct AppState {
    dashboard: Dashboard,
    templates: Handlebars<'static>,
    title: String,
    refresh_secs: u64,
}

impl AppState {
    pub fn new(
        dashboard: Dashboard,
        title: impl Into<String>,
        refresh_secs: u64,
    ) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string(PAGE_TEMPLATE, include_str!("./static/dashboard.hbs"))?;

        Ok(Self {
            dashboard,
            templates,
            title: title.into(),
            refresh_secs,
        })
    }
}

#[derive(Deserialize, Default)]
struct TableQuery {
    sort: Option<Column>,
    order: Option<SortOrder>,
}

impl TableQuery {
    fn table_sort(&self) -> TableSort {
        let column = self.sort.unwrap_or(Column::Date);
        TableSort {
            column,
            order: self.order.unwrap_or_else(|| default_order(column)),
        }
    }
}

fn default_order(column: Column) -> SortOrder {
    match column {
        Column::Date | Column::Amount => SortOrder::Desc,
        _ => SortOrder::Asc,
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.fetch_timeout())
        .user_agent(concat!("escudo/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let loader = FeedLoader::new(feed::open(&config.feed_url, client), config.cache_ttl());
    let state = AppState::new(Dashboard::new(loader), &config.title, config.refresh_secs)
        .context("registering dashboard template")?;

    let app = router(Arc::new(state));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(
        addr = %config.bind,
        feed = %config.feed_url,
        refresh = ?config.refresh_interval(),
        cache_ttl = ?config.cache_ttl(),
        "dashboard listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dashboard stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/dashboard", get(get_dashboard))
        .route("/export/registros.csv", get(export_csv))
        .route("/export/registros.xlsx", get(export_xlsx))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_dashboard(
    Query(params): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let sort = params.table_sort();
    let model = state.dashboard.run_cycle(sort).await;

    match render_page(&state, &model, sort) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "dashboard template failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo generar el panel").into_response()
        }
    }
}

async fn get_dashboard(
    Query(params): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<RenderModel> {
    Json(state.dashboard.run_cycle(params.table_sort()).await)
}

fn render_page(
    state: &AppState,
    model: &RenderModel,
    sort: TableSort,
) -> Result<String, handlebars::RenderError> {
    let context = match model {
        RenderModel::NoData(no_data) => json!({
            "title": state.title,
            "refresh_secs": state.refresh_secs,
            "no_data": no_data,
        }),
        RenderModel::HasData(report) => {
            let daily = graph::daily_chart_svg(
                &report.daily,
                &ChartOptions::new("Historial de Análisis", 760, 400),
            );
            let ring = graph::verdict_ring_svg(
                &report.shares,
                &ChartOptions::new("Estado de Riesgo", 380, 400),
            );

            json!({
                "title": state.title,
                "refresh_secs": state.refresh_secs,
                "report": report,
                "daily_chart": chart_or_notice("daily", daily),
                "ring_chart": chart_or_notice("verdicts", ring),
                "headers": sort_headers(sort),
                "generated_at": report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            })
        }
    };

    state.templates.render(PAGE_TEMPLATE, &context)
}

fn chart_or_notice(name: &str, chart: Result<String, Box<dyn Error>>) -> String {
    chart.unwrap_or_else(|e| {
        error!(chart = name, error = %e, "chart rendering failed");
        r#"<p class="banner error">No se pudo dibujar el gráfico.</p>"#.to_string()
    })
}

/// Header cells of the detail table, each linking to the next sort state.
fn sort_headers(current: TableSort) -> Vec<Value> {
    Column::ALL
        .iter()
        .map(|&column| {
            let active = current.column == column;
            let next = match (active, current.order) {
                (true, SortOrder::Asc) => SortOrder::Desc,
                (true, SortOrder::Desc) => SortOrder::Asc,
                (false, _) => default_order(column),
            };
            let arrow = match (active, current.order) {
                (false, _) => "",
                (true, SortOrder::Asc) => " ▲",
                (true, SortOrder::Desc) => " ▼",
            };
            json!({
                "label": column.header(),
                "href": format!("/?sort={}&order={}", column.key(), next.key()),
                "arrow": arrow,
            })
        })
        .collect()
}

async fn export_csv(State(state): State<Arc<AppState>>) -> Response {
    let table = state.dashboard.snapshot().await;
    match downloader::to_csv(&table) {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"registros.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "CSV export failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn export_xlsx(State(state): State<Arc<AppState>>) -> Response {
    let table = state.dashboard.snapshot().await;
    match downloader::to_xlsx(&table) {
        Ok(bytes) => (
            [
                (
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"registros.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "XLSX export failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedSource;
    use crate::feed::tests::StaticFeed;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    const FEED: &str = "Fecha,Emisor,Monto,Veredicto,Analisis,Confianza\n\
                        2024-01-01,Alfa,100,SEGURO,ok,ALTA\n\
                        2024-01-02,Beta,\"1,500\",FRAUDE,<b>RUT falso</b>,ALTA\n\
                        2024-01-02,Gamma,900,VERIFICAR,revisar,MEDIA\n";

    fn app(source: impl FeedSource + 'static) -> Router {
        let loader = FeedLoader::new(Box::new(source), Duration::from_secs(30));
        let state = AppState::new(Dashboard::new(loader), "Centro de Mando", 60).unwrap();
        router(Arc::new(state))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn failing_feed_renders_only_the_warning() {
        let (feed, _) = StaticFeed::failing(500);
        let (status, html) = get(app(feed), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("No se encontraron datos"));
        assert!(html.contains("500"));
        assert!(!html.contains("<svg"));
        assert!(!html.contains("Amenazas Detectadas"));
    }

    #[tokio::test]
    async fn data_page_has_tiles_charts_and_escaped_rows() {
        let (feed, _) = StaticFeed::ok(FEED);
        let (status, html) = get(app(feed), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(r#"http-equiv="refresh" content="60""#));
        assert!(html.contains("Amenazas Detectadas"));
        assert!(html.contains("$ 2.400"));
        assert_eq!(html.matches("<svg").count(), 2);
        assert!(html.contains("&lt;b&gt;RUT falso&lt;/b&gt;"));
        assert!(html.contains(crate::style::FRAUD.hex));
    }

    #[tokio::test]
    async fn json_endpoint_honours_sort() {
        let (feed, _) = StaticFeed::ok(FEED);
        let (status, body) = get(app(feed), "/api/dashboard?sort=amount&order=asc").await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["state"], "has_data");
        assert_eq!(value["metrics"]["threats"], 2);
        assert_eq!(value["rows"][0]["issuer"], "Alfa");
        assert_eq!(value["rows"][2]["issuer"], "Beta");
    }

    #[tokio::test]
    async fn unknown_sort_column_is_rejected() {
        let (feed, hits) = StaticFeed::ok(FEED);
        let (status, _) = get(app(feed), "/?sort=color").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn csv_export_downloads_the_table() {
        let (feed, _) = StaticFeed::ok(FEED);
        let resp = app(feed)
            .oneshot(
                Request::builder()
                    .uri("/export/registros.csv")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();
        assert!(csv.starts_with("Fecha,Emisor,Monto,Veredicto,Analisis,Confianza\n"));
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn headers_toggle_the_active_column() {
        let headers = sort_headers(TableSort::default());
        assert_eq!(headers[0]["href"], "/?sort=date&order=asc");
        assert_eq!(headers[0]["arrow"], " ▼");
        assert_eq!(headers[1]["href"], "/?sort=issuer&order=asc");
        assert_eq!(headers[2]["href"], "/?sort=amount&order=desc");
    }
}
