use thiserror::Error;

/// Failure to obtain a usable table from the feed.
///
/// Every variant is recovered by [`crate::feed::FeedLoader::load`], which
/// substitutes an empty table and keeps the rendered message for the warning
/// banner.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network, address or TLS failure while talking to the feed
    #[error("no se pudo conectar con {address}: {source}")]
    Http {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    /// The feed answered, but not with a 2xx status
    #[error("{address} respondió con estado HTTP {status}")]
    Status { address: String, status: u16 },

    /// A local feed file could not be read
    #[error("no se pudo leer {address}: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid CSV
    #[error("CSV mal formado: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, FeedError>;
