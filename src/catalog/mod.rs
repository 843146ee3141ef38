//! Voice-over sample catalog.
//!
//! The catalog is re-derived wholesale from its source on every reload and
//! published as an immutable [`CatalogSnapshot`]. Readers clone an `Arc` to the
//! current snapshot and never observe a partially rebuilt list.
//!
//! # Reload failures
//!
//! A failed reload (unreachable source, missing link column) keeps serving the
//! last known good snapshot. Only a successful reload replaces it.

mod normalize;
mod source;

pub use normalize::{normalize, ColumnMap, Field, Normalized, FIELD_KEYWORDS};
pub use source::{parse_csv, source_for, CatalogSource, CsvFileSource, CsvUrlSource, StaticSource};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use voxlink_common::CatalogEntry;

/// Rows shown when browsing without a keyword.
pub const BROWSE_LIMIT: usize = 10;
/// Rows shown when a keyword is given.
pub const SEARCH_LIMIT: usize = 100;

/// Header row plus string cells, as delivered by a [`CatalogSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reasons a catalog reload fails.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No column matched a required field.
    #[error("no {0} column found in catalog")]
    MissingColumn(&'static str),

    /// The source could not be read.
    #[error("catalog source unavailable: {0:#}")]
    Source(#[from] anyhow::Error),
}

/// Browse filter. `None` means "all".
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub voice: Option<String>,
    pub style: Option<String>,
    pub keyword: Option<String>,
}

impl SearchFilter {
    fn keyword(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
    }
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchResults<'a> {
    pub entries: Vec<&'a CatalogEntry>,
    /// Matches before the row limit was applied.
    pub total: usize,
    pub limit: usize,
}

impl SearchResults<'_> {
    pub fn has_more(&self) -> bool {
        self.total > self.entries.len()
    }
}

/// Distinct classification values for the filter selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub voices: Vec<String>,
    pub styles: Vec<String>,
}

/// Immutable view of the catalog at one reload.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub dropped_rows: usize,
}

impl CatalogSnapshot {
    /// Snapshot served before the first successful load.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            loaded_at: None,
            dropped_rows: 0,
        }
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            loaded_at: Some(Utc::now()),
            dropped_rows: 0,
        }
    }

    fn from_normalized(normalized: Normalized) -> Self {
        Self {
            entries: normalized.entries,
            loaded_at: Some(Utc::now()),
            dropped_rows: normalized.dropped_rows,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact identifier lookup; the first entry wins on duplicates.
    pub fn find_by_id(&self, id: &str) -> Option<&CatalogEntry> {
        let id = id.trim();
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    /// Legacy `?n=` lookup: case-insensitive substring of the display name.
    pub fn find_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.name.to_lowercase().contains(&needle))
    }

    /// Filter by voice, style and keyword, keeping catalog order.
    pub fn search(&self, filter: &SearchFilter) -> SearchResults<'_> {
        let keyword = filter.keyword();
        let limit = if keyword.is_some() {
            SEARCH_LIMIT
        } else {
            BROWSE_LIMIT
        };

        let matches: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| filter.voice.as_deref().map_or(true, |v| e.voice == v))
            .filter(|e| filter.style.as_deref().map_or(true, |s| e.primary_style == s))
            .filter(|e| {
                keyword
                    .as_deref()
                    .map_or(true, |k| e.name.to_lowercase().contains(k))
            })
            .collect();

        let total = matches.len();
        SearchResults {
            entries: matches.into_iter().take(limit).collect(),
            total,
            limit,
        }
    }

    pub fn facets(&self) -> Facets {
        let mut facets = Facets::default();
        for entry in &self.entries {
            if !facets.voices.contains(&entry.voice) {
                facets.voices.push(entry.voice.clone());
            }
            if !facets.styles.contains(&entry.primary_style) {
                facets.styles.push(entry.primary_style.clone());
            }
        }
        facets
    }
}

/// Summary of a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub entries: usize,
    pub dropped_rows: usize,
}

/// Holder of the current snapshot, replaced atomically on reload.
pub struct CatalogStore {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::with_snapshot(CatalogSnapshot::empty())
    }

    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Current snapshot. Cheap; callers may hold it across awaits.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Fetch, normalize and publish a new snapshot.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn reload(&self, source: &dyn CatalogSource) -> Result<ReloadSummary, CatalogError> {
        let result = async {
            let table = source.fetch_table().await?;
            normalize(&table)
        }
        .await;

        match result {
            Ok(normalized) => {
                let summary = ReloadSummary {
                    entries: normalized.entries.len(),
                    dropped_rows: normalized.dropped_rows,
                };
                *self.current.write() = Arc::new(CatalogSnapshot::from_normalized(normalized));
                tracing::info!(
                    source = %source.describe(),
                    entries = summary.entries,
                    dropped_rows = summary.dropped_rows,
                    "Catalog reloaded"
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    source = %source.describe(),
                    error = %e,
                    kept_entries = self.current.read().len(),
                    "Catalog reload failed, keeping previous snapshot"
                );
                Err(e)
            }
        }
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Start a background task that reloads the catalog periodically.
///
/// The first tick fires immediately, so this also performs the initial load.
pub fn start_reload_task(
    store: Arc<CatalogStore>,
    source: Arc<dyn CatalogSource>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            // Failures are logged by reload and the old snapshot is kept.
            let _ = store.reload(source.as_ref()).await;
        }
    })
}
