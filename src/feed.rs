use crate::cache::TtlCache;
use crate::error::{FeedError, Result};
use crate::loader;
use crate::record::Table;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the CSV document comes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Address the source was configured with; also the cache key
    fn address(&self) -> &str;

    /// Retrieve the full current document
    async fn fetch(&self) -> Result<String>;
}

/// Published sheet reachable over HTTP(S)
pub struct HttpFeed {
    client: Client,
    url: String,
}

impl HttpFeed {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn address(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        let http = |source| FeedError::Http {
            address: self.url.clone(),
            source,
        };

        let resp = self.client.get(&self.url).send().await.map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                address: self.url.clone(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(http)
    }
}

/// CSV export on the local disk
pub struct FileFeed {
    address: String,
    path: PathBuf,
}

impl FileFeed {
    pub fn new(address: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            address: address.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl FeedSource for FileFeed {
    fn address(&self) -> &str {
        &self.address
    }

    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FeedError::Io {
                address: self.address.clone(),
                source,
            })
    }
}

/// Pick a source for a configured address.
///
/// `file://` URLs and anything that does not parse as an absolute URL are
/// read from disk; every other URL goes through `client`.
pub fn open(address: &str, client: Client) -> Box<dyn FeedSource> {
    match Url::parse(address) {
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .unwrap_or_else(|_| PathBuf::from(url.path()));
            Box::new(FileFeed::new(address, path))
        }
        Ok(_) => Box::new(HttpFeed::new(client, address)),
        Err(_) => Box::new(FileFeed::new(address, address)),
    }
}

/// Result of one load: always a table, plus the error that emptied it.
#[derive(Clone, Debug)]
pub struct LoadOutcome {
    pub table: Arc<Table>,
    pub error: Option<String>,
    pub from_cache: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Fetches and normalizes the feed, memoizing successful loads for a short
/// TTL keyed by the source address.
pub struct FeedLoader {
    source: Box<dyn FeedSource>,
    cache: TtlCache<(Arc<Table>, DateTime<Utc>)>,
}

impl FeedLoader {
    pub fn new(source: Box<dyn FeedSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn address(&self) -> &str {
        self.source.address()
    }

    /// Current table, from the cache when fresh.
    ///
    /// Never fails: a fetch or parse error yields an empty table and the
    /// error text. Failures are not cached.
    pub async fn load(&mut self) -> LoadOutcome {
        let now = Instant::now();
        let address = self.source.address().to_string();

        if let Some((table, fetched_at)) = self.cache.get(&address, now) {
            debug!(%address, records = table.len(), "feed cache hit");
            return LoadOutcome {
                table,
                error: None,
                from_cache: true,
                fetched_at,
            };
        }

        self.cache.purge(now);
        let fetched_at = Utc::now();
        let started = Instant::now();

        match self.fetch_table().await {
            Ok(table) => {
                info!(
                    %address,
                    records = table.len(),
                    synthesized = table.synthesized.len(),
                    elapsed = ?started.elapsed(),
                    "feed loaded"
                );
                let table = Arc::new(table);
                self.cache
                    .insert(&address, (Arc::clone(&table), fetched_at), now);
                LoadOutcome {
                    table,
                    error: None,
                    from_cache: false,
                    fetched_at,
                }
            }
            Err(err) => {
                warn!(%address, error = %err, "feed load failed");
                LoadOutcome {
                    table: Arc::new(Table::default()),
                    error: Some(err.to_string()),
                    from_cache: false,
                    fetched_at,
                }
            }
        }
    }

    async fn fetch_table(&self) -> Result<Table> {
        let text = self.source.fetch().await?;
        loader::from_csv_str(&text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source that counts fetches.
    pub(crate) struct StaticFeed {
        pub body: std::result::Result<String, u16>,
        pub hits: Arc<AtomicUsize>,
    }

    impl StaticFeed {
        pub(crate) fn ok(body: &str) -> (Self, Arc<AtomicUsize>) {
            let hits = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    body: Ok(body.to_string()),
                    hits: Arc::clone(&hits),
                },
                hits,
            )
        }

        pub(crate) fn failing(status: u16) -> (Self, Arc<AtomicUsize>) {
            let hits = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    body: Err(status),
                    hits: Arc::clone(&hits),
                },
                hits,
            )
        }
    }

    #[async_trait]
    impl FeedSource for StaticFeed {
        fn address(&self) -> &str {
            "memory://feed"
        }

        async fn fetch(&self) -> Result<String> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.body.clone().map_err(|status| FeedError::Status {
                address: self.address().to_string(),
                status,
            })
        }
    }

    const CSV: &str = "Fecha,Emisor,Monto,Veredicto,Analisis,Confianza\n\
                       2024-01-01,ACME,100,SEGURO,ok,ALTA\n";

    #[tokio::test]
    async fn loads_within_ttl_share_one_fetch() {
        let (feed, hits) = StaticFeed::ok(CSV);
        let mut loader = FeedLoader::new(Box::new(feed), Duration::from_secs(60));

        let first = loader.load().await;
        let second = loader.load().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert!(Arc::ptr_eq(&first.table, &second.table));
        assert_eq!(first.fetched_at, second.fetched_at);
    }

    #[tokio::test]
    async fn expired_cache_refetches() {
        let (feed, hits) = StaticFeed::ok(CSV);
        let mut loader = FeedLoader::new(Box::new(feed), Duration::ZERO);

        loader.load().await;
        loader.load().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_becomes_empty_table_and_is_not_cached() {
        let (feed, hits) = StaticFeed::failing(503);
        let mut loader = FeedLoader::new(Box::new(feed), Duration::from_secs(60));

        let outcome = loader.load().await;
        assert!(outcome.table.is_empty());
        let error = outcome.error.expect("error should be reported");
        assert!(error.contains("503"));

        loader.load().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_empty_table() {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let mut loader = FeedLoader::new(
            open("http://127.0.0.1:9/feed.csv", client),
            Duration::from_secs(60),
        );

        let outcome = loader.load().await;
        assert!(outcome.table.is_empty());
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn file_addresses_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        std::fs::write(&path, CSV).unwrap();

        let address = path.to_string_lossy().to_string();
        let mut loader = FeedLoader::new(open(&address, Client::new()), Duration::ZERO);
        let outcome = loader.load().await;

        assert_eq!(outcome.error, None);
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(loader.address(), address);
    }
}
