//! Audio fetch proxy with a time-bounded, single-flight cache.
//!
//! [`FetchCache::resolve`] turns a raw catalog link into an inline payload.
//! The link is first rewritten to its provider's direct-download form, which
//! is also the cache key. Each key owns one async mutex: the first caller on a
//! miss holds it for the whole retrieval, so concurrent callers for the same
//! key wait and then read the stored result, while distinct keys proceed in
//! parallel.
//!
//! Successful payloads live for `positive_ttl`; failures are cached as negative
//! results for the shorter `negative_ttl`. Expiry is lazy, with an optional
//! background sweep.

mod fetcher;
mod payload;

pub use fetcher::{FetchFailure, FetchedAudio, Fetcher, HttpFetcher};
pub use payload::{audio_mime, encode, InlinePayload, DEFAULT_MIME};

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::links;

/// Result shared by every caller of one retrieval.
pub type Resolution = Result<Arc<InlinePayload>, FetchFailure>;

/// Cache timing and size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub positive_ttl: Duration,
    pub negative_ttl: Duration,
    pub fetch_timeout: Duration,
    /// Cap on cached payload bytes; 0 means unbounded.
    pub max_bytes: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            positive_ttl: Duration::from_secs(config.positive_ttl_secs),
            negative_ttl: Duration::from_secs(config.negative_ttl_secs),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_bytes: config.max_bytes,
        }
    }
}

/// Stored outcome of one retrieval.
struct CacheEntry {
    resolution: Resolution,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) < self.ttl
    }

    fn size(&self) -> usize {
        self.resolution
            .as_ref()
            .map(|payload| payload.cached_size())
            .unwrap_or(0)
    }
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub failures: u64,
    pub evictions: u64,
}

/// Thread-safe single-flight cache in front of a [`Fetcher`].
pub struct FetchCache {
    slots: DashMap<String, Slot>,
    fetcher: Arc<dyn Fetcher>,
    settings: CacheSettings,
    total_bytes: AtomicUsize,
    counters: Counters,
}

impl FetchCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CacheSettings) -> Self {
        Self {
            slots: DashMap::new(),
            fetcher,
            settings,
            total_bytes: AtomicUsize::new(0),
            counters: Counters::default(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Resolve a raw link to an inline payload.
    ///
    /// Malformed links fail immediately without touching the cache.
    pub async fn resolve(&self, raw_link: &str) -> Resolution {
        match links::direct_download_url(raw_link) {
            Some(key) => self.resolve_key(key).await,
            None => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                Err(FetchFailure::Malformed(raw_link.trim().to_string()))
            }
        }
    }

    async fn resolve_key(&self, key: String) -> Resolution {
        // The shard lock is released at the end of this statement; only the
        // slot's own mutex is held across the fetch.
        let slot: Slot = Arc::clone(self.slots.entry(key.clone()).or_default().value());

        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref().filter(|e| e.is_fresh(Instant::now())) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(url = %key, ok = entry.resolution.is_ok(), "Fetch cache hit");
            return entry.resolution.clone();
        }
        // The slot stays empty until the new result is stored, so a caller
        // dropped mid-fetch leaves nothing that is counted twice.
        if let Some(stale) = guard.take() {
            self.total_bytes.fetch_sub(stale.size(), Ordering::Relaxed);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let resolution = self.fetch(&key).await;
        let ttl = if resolution.is_ok() {
            self.settings.positive_ttl
        } else {
            self.settings.negative_ttl
        };
        let entry = CacheEntry {
            resolution: resolution.clone(),
            created_at: Instant::now(),
            ttl,
        };
        self.total_bytes.fetch_add(entry.size(), Ordering::Relaxed);
        *guard = Some(entry);
        drop(guard);

        if resolution.is_ok() {
            self.enforce_bound();
        }

        resolution
    }

    async fn fetch(&self, key: &str) -> Resolution {
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::info!(url = %key, "Fetching audio from provider");

        let started = Instant::now();
        let result =
            match tokio::time::timeout(self.settings.fetch_timeout, self.fetcher.fetch(key)).await
            {
                Ok(result) => result,
                Err(_) => Err(FetchFailure::Timeout(self.settings.fetch_timeout)),
            };

        match result {
            Ok(audio) => {
                let payload = encode(&audio);
                tracing::info!(
                    url = %key,
                    mime = %payload.mime,
                    bytes = payload.byte_len,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Audio fetched"
                );
                Ok(Arc::new(payload))
            }
            Err(failure) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    url = %key,
                    error = %failure,
                    negative_ttl_secs = self.settings.negative_ttl.as_secs(),
                    "Audio fetch failed"
                );
                Err(failure)
            }
        }
    }

    /// Evict the oldest idle payloads until the byte cap is respected.
    ///
    /// A slot is only removed while the map is its sole owner, so no caller
    /// can be waiting on it and single-flight is preserved.
    fn enforce_bound(&self) {
        let max = self.settings.max_bytes;
        if max == 0 || self.total_bytes.load(Ordering::Relaxed) <= max {
            return;
        }

        let mut candidates: Vec<(String, Instant)> = self
            .slots
            .iter()
            .filter(|slot| Arc::strong_count(slot.value()) == 1)
            .filter_map(|slot| {
                let guard = slot.value().try_lock().ok()?;
                let entry = guard.as_ref()?;
                (entry.size() > 0).then(|| (slot.key().clone(), entry.created_at))
            })
            .collect();
        candidates.sort_by_key(|(_, created_at)| *created_at);

        for (key, _) in candidates {
            if self.total_bytes.load(Ordering::Relaxed) <= max {
                break;
            }
            if let Some(size) = self.remove_idle(&key, |_| true) {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(url = %key, bytes = size, "Evicted cached payload");
            }
        }
    }

    /// Remove `key` if nobody else holds its slot and `predicate` accepts the
    /// entry. Returns the freed byte count.
    fn remove_idle(&self, key: &str, predicate: impl Fn(&CacheEntry) -> bool) -> Option<usize> {
        let mut freed = None;
        self.slots.remove_if(key, |_, slot| {
            if Arc::strong_count(slot) != 1 {
                return false;
            }
            match slot.try_lock() {
                Ok(guard) => match guard.as_ref() {
                    Some(entry) if predicate(entry) => {
                        freed = Some(entry.size());
                        true
                    }
                    Some(_) => false,
                    None => {
                        freed = Some(0);
                        true
                    }
                },
                Err(_) => false,
            }
        });
        if let Some(size) = freed {
            self.total_bytes.fetch_sub(size, Ordering::Relaxed);
        }
        freed
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let keys: Vec<String> = self.slots.iter().map(|slot| slot.key().clone()).collect();

        let removed = keys
            .iter()
            .filter(|key| self.remove_idle(key, |entry| !entry.is_fresh(now)).is_some())
            .count();

        if removed > 0 {
            tracing::debug!(removed, "Swept expired fetch cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.len(),
            bytes: self.total_bytes.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Start a background task that periodically sweeps expired entries.
pub fn start_sweep_task(cache: Arc<FetchCache>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            cache.cleanup_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;

    /// Counts retrievals and answers from a script.
    struct ScriptedFetcher {
        calls: AtomicUsize,
        delay: Duration,
        respond: Box<dyn Fn(&str) -> Result<FetchedAudio, FetchFailure> + Send + Sync>,
    }

    impl ScriptedFetcher {
        fn ok(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                respond: Box::new(|url| {
                    Ok(FetchedAudio {
                        bytes: Bytes::from(url.as_bytes().to_vec()),
                        content_type: Some("audio/mpeg".into()),
                    })
                }),
            })
        }

        fn failing(delay: Duration, failure: FetchFailure) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                respond: Box::new(move |_| Err(failure.clone())),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedAudio, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            (self.respond)(url)
        }
    }

    fn settings() -> CacheSettings {
        CacheSettings {
            positive_ttl: Duration::from_secs(600),
            negative_ttl: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(15),
            max_bytes: 0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolutions_fetch_once() {
        let fetcher = ScriptedFetcher::ok(Duration::from_millis(500));
        let cache = FetchCache::new(fetcher.clone(), settings());

        let (a, b) = tokio::join!(
            cache.resolve("https://provider/y"),
            cache.resolve("https://provider/y")
        );

        assert_eq!(fetcher.calls(), 1);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_concurrent_callers_share_one_fetch() {
        let fetcher = ScriptedFetcher::ok(Duration::from_millis(200));
        let cache = Arc::new(FetchCache::new(fetcher.clone(), settings()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.resolve("https://provider/shared").await })
            })
            .collect();
        let results = futures::future::join_all(tasks).await;

        assert_eq!(fetcher.calls(), 1);
        let first = results[0].as_ref().unwrap().as_ref().unwrap().clone();
        for result in results {
            assert!(Arc::ptr_eq(&first, result.unwrap().as_ref().unwrap()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_fetch_in_parallel() {
        let fetcher = ScriptedFetcher::ok(Duration::from_secs(1));
        let cache = FetchCache::new(fetcher.clone(), settings());

        let started = Instant::now();
        let (a, b) = tokio::join!(
            cache.resolve("https://provider/a"),
            cache.resolve("https://provider/b")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetcher.calls(), 2);
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_positive_entry_served_until_ttl() {
        let fetcher = ScriptedFetcher::ok(Duration::ZERO);
        let cache = FetchCache::new(fetcher.clone(), settings());

        cache.resolve("https://provider/x").await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(599)).await;
        cache.resolve("https://provider/x").await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        let (a, b) = tokio::join!(
            cache.resolve("https://provider/x"),
            cache.resolve("https://provider/x")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_shared_and_negatively_cached() {
        let fetcher = ScriptedFetcher::ok(Duration::from_secs(3600));
        let cache = FetchCache::new(fetcher.clone(), settings());

        let (a, b) = tokio::join!(
            cache.resolve("https://provider/y"),
            cache.resolve("https://provider/y")
        );
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(a.unwrap_err(), FetchFailure::Timeout(Duration::from_secs(15)));
        assert_eq!(b.unwrap_err(), FetchFailure::Timeout(Duration::from_secs(15)));

        tokio::time::advance(Duration::from_secs(10)).await;
        let again = cache.resolve("https://provider/y").await;
        assert!(matches!(again, Err(FetchFailure::Timeout(_))));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_entry_expires_before_positive_ttl() {
        let fetcher = ScriptedFetcher::failing(Duration::ZERO, FetchFailure::Status(404));
        let cache = FetchCache::new(fetcher.clone(), settings());

        assert_eq!(
            cache.resolve("https://provider/gone").await.unwrap_err(),
            FetchFailure::Status(404)
        );
        tokio::time::advance(Duration::from_secs(29)).await;
        cache.resolve("https://provider/gone").await.unwrap_err();
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        cache.resolve("https://provider/gone").await.unwrap_err();
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.stats().failures, 2);
    }

    #[tokio::test]
    async fn test_malformed_link_not_fetched() {
        let fetcher = ScriptedFetcher::ok(Duration::ZERO);
        let cache = FetchCache::new(fetcher.clone(), settings());

        let err = cache.resolve("not a link").await.unwrap_err();
        assert_eq!(err, FetchFailure::Malformed("not a link".into()));
        assert_eq!(fetcher.calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_key_is_provider_rewritten_url() {
        let fetcher = ScriptedFetcher::ok(Duration::ZERO);
        let cache = FetchCache::new(fetcher.clone(), settings());

        cache.resolve("https://1drv.ms/u/s!abc").await.unwrap();
        cache.resolve("https://1drv.ms/u/s!abc?download=1").await.unwrap();
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_payload_is_data_uri() {
        let fetcher = ScriptedFetcher::ok(Duration::ZERO);
        let cache = FetchCache::new(fetcher, settings());

        let payload = cache.resolve("https://provider/x").await.unwrap();
        assert_eq!(payload.mime, "audio/mpeg");
        assert!(payload.data_uri.starts_with("data:audio/mpeg;base64,"));
        assert_eq!(payload.byte_len, "https://provider/x".len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_removes_stale_entries() {
        let fetcher = ScriptedFetcher::ok(Duration::ZERO);
        let cache = FetchCache::new(fetcher, settings());

        cache.resolve("https://provider/a").await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        cache.resolve("https://provider/b").await.unwrap();
        assert_eq!(cache.cleanup_expired(), 0);

        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        let expected = encode(&FetchedAudio {
            bytes: Bytes::from_static(b"https://provider/b"),
            content_type: None,
        })
        .cached_size();
        assert_eq!(stats.bytes, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_refresh_keeps_byte_count() {
        let fetcher = ScriptedFetcher::ok(Duration::from_secs(5));
        let cache = FetchCache::new(
            fetcher.clone(),
            CacheSettings {
                max_bytes: 1 << 20,
                ..settings()
            },
        );

        cache.resolve("https://provider/a").await.unwrap();
        assert!(cache.stats().bytes > 0);
        tokio::time::advance(Duration::from_secs(601)).await;

        // Give up on the refresh before the provider answers.
        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), cache.resolve("https://provider/a")).await;
        assert!(abandoned.is_err());
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.stats().bytes, 0);

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.stats().bytes, 0);
        assert!(cache.is_empty());

        // Later inserts are not evicted by a corrupted total.
        cache.resolve("https://provider/b").await.unwrap();
        cache.resolve("https://provider/b").await.unwrap();
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_byte_cap_evicts_oldest() {
        let one = encode(&FetchedAudio {
            bytes: Bytes::from_static(b"https://provider/a"),
            content_type: None,
        })
        .cached_size();
        let fetcher = ScriptedFetcher::ok(Duration::ZERO);
        let cache = FetchCache::new(
            fetcher.clone(),
            CacheSettings {
                max_bytes: one * 2,
                ..settings()
            },
        );

        for key in ["a", "b", "c"] {
            cache
                .resolve(&format!("https://provider/{key}"))
                .await
                .unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entries, 2);
        assert!(stats.bytes <= one * 2);

        cache.resolve("https://provider/a").await.unwrap();
        assert_eq!(fetcher.calls(), 4);
    }
}
