//! Outbound retrieval of audio bytes from the storage provider.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;

/// Why a retrieval produced no playable payload.
///
/// `Clone` so that every caller waiting on the same in-flight fetch receives
/// the identical failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("link is malformed: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("provider returned an empty body")]
    EmptyBody,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Raw response of a successful retrieval.
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub bytes: Bytes,
    /// `Content-Type` as sent by the provider, if any.
    pub content_type: Option<String>,
}

/// Performs one outbound GET. Implementations must not retry.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedAudio, FetchFailure>;
}

/// [`Fetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("voxlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client, timeout }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAudio, FetchFailure> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchFailure::Timeout(self.timeout)
            } else if e.is_builder() {
                FetchFailure::Malformed(url.to_string())
            } else {
                FetchFailure::Transport(e.to_string())
            }
        };

        let response = self.client.get(url).send().await.map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(map_err)?;
        if bytes.is_empty() {
            return Err(FetchFailure::EmptyBody);
        }

        Ok(FetchedAudio {
            bytes,
            content_type,
        })
    }
}
