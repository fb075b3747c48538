//! Error type shared by the client and the offline store.
//!
//! Clustering itself never fails; only I/O surfaces produce these.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[cfg(feature = "http")]
    #[error("{0} returned no data")]
    EmptyResponse(String),

    #[cfg(feature = "http")]
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("failed to read photo {path}: {source}")]
    Photo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "offline")]
    #[error("offline store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
