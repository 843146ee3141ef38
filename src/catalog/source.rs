//! Catalog transports.
//!
//! The catalog is a published spreadsheet exported as CSV, either fetched over
//! HTTP or read from disk. Both adapters hand the normalizer an opaque
//! [`RawTable`] of strings.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use super::RawTable;

/// Timeout for fetching a remote catalog export
const CATALOG_TIMEOUT: Duration = Duration::from_secs(20);

/// Something that yields the catalog as rows of strings.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable location for logs.
    fn describe(&self) -> String;

    /// Fetch the current table.
    async fn fetch_table(&self) -> Result<RawTable>;
}

/// Pick an adapter based on whether `location` looks like a URL.
pub fn source_for(location: &str) -> Box<dyn CatalogSource> {
    let trimmed = location.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Box::new(CsvUrlSource::new(trimmed))
    } else {
        let expanded = shellexpand::tilde(trimmed);
        Box::new(CsvFileSource::new(PathBuf::from(expanded.as_ref())))
    }
}

/// Parse CSV text into a [`RawTable`].
///
/// Header names are trimmed; short rows are kept as-is and padded by the
/// normalizer's bounds checks.
pub fn parse_csv(text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read catalog header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed catalog row {}", line + 2))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// CSV export served over HTTP.
pub struct CsvUrlSource {
    client: Client,
    url: String,
}

impl CsvUrlSource {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(CATALOG_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogSource for CsvUrlSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch_table(&self) -> Result<RawTable> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to GET catalog {}", self.url))?;

        if !response.status().is_success() {
            anyhow::bail!("Catalog {} returned {}", self.url, response.status());
        }

        let text = response
            .text()
            .await
            .context("Failed to read catalog body")?;
        parse_csv(&text)
    }
}

/// CSV file on local disk.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl CatalogSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_table(&self) -> Result<RawTable> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read catalog file: {:?}", self.path))?;
        parse_csv(&text)
    }
}

/// In-memory table, for tests and one-off tooling.
pub struct StaticSource(pub RawTable);

#[async_trait::async_trait]
impl CatalogSource for StaticSource {
    fn describe(&self) -> String {
        "static".to_string()
    }

    async fn fetch_table(&self) -> Result<RawTable> {
        Ok(self.0.clone())
    }
}
