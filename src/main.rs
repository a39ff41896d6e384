#![cfg(not(tarpaulin_include))]

use escudo::config::Config;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,escudo=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let config = Config::load();

    // Start the web application
    escudo::app::run(config).await
}
