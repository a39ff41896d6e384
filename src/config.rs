use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Process configuration, fixed at start.
///
/// Every option can come from the command line or from the environment
/// (a `.env` file in the working directory is loaded first).
#[derive(Clone, Debug, Parser)]
#[command(name = "escudo", version, about = "Panel de monitoreo de fraude para pymes")]
pub struct Config {
    /// Published CSV address (http(s)://, file:// or a local path)
    #[arg(long, env = "ESCUDO_FEED_URL")]
    pub feed_url: String,

    /// Seconds between automatic page refreshes
    #[arg(long, env = "ESCUDO_REFRESH_SECS", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_secs: u64,

    /// Seconds a fetched table is reused before the feed is read again
    #[arg(long, env = "ESCUDO_CACHE_TTL_SECS", default_value_t = 10)]
    pub cache_ttl_secs: u64,

    /// Timeout for one feed request
    #[arg(long, env = "ESCUDO_FETCH_TIMEOUT_SECS", default_value_t = 15,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout_secs: u64,

    /// Address the dashboard listens on
    #[arg(long, env = "ESCUDO_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Page heading
    #[arg(long, env = "ESCUDO_TITLE", default_value = "Centro de Mando: Escudo Pyme")]
    pub title: String,
}

impl Config {
    /// Read `.env`, then parse arguments and environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Config::parse()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
