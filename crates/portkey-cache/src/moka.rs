use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use portkey_core::cache::Result;
use portkey_core::{CachedLink, DayCount, RedirectCache, SearchEntry, ShortCode};
use std::time::{Duration, Instant};
use tracing::trace;

/// An in-process implementation of [`RedirectCache`] using Moka.
///
/// Each namespace lives in its own cache so capacity pressure on one
/// (say, search entries) cannot evict redirect targets. The per-write TTL
/// from the contract is honored through Moka's expiry policy.
#[derive(Debug, Clone)]
pub struct MokaRedirectCache {
    links: Cache<String, TtlEntry<CachedLink>>,
    searches: Cache<String, TtlEntry<SearchEntry>>,
    daily: Cache<String, TtlEntry<Vec<DayCount>>>,
}

#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    ttl: Duration,
}

struct PerEntryTtl;

impl<K, V> Expiry<K, TtlEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        entry: &TtlEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

const DEFAULT_CAPACITY: u64 = 10_000;

fn build_cache<V: Clone + Send + Sync + 'static>(max_capacity: u64) -> Cache<String, TtlEntry<V>> {
    Cache::builder()
        .max_capacity(max_capacity)
        .expire_after(PerEntryTtl)
        .build()
}

impl MokaRedirectCache {
    /// Creates a new in-process cache with a default per-namespace
    /// capacity of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a new in-process cache with a custom per-namespace capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            links: build_cache(max_capacity),
            searches: build_cache(max_capacity),
            daily: build_cache(max_capacity),
        }
    }
}

impl Default for MokaRedirectCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RedirectCache for MokaRedirectCache {
    async fn get_link(&self, code: &ShortCode) -> Result<Option<CachedLink>> {
        trace!(code = %code, "fetching link entry from Moka cache");
        Ok(self
            .links
            .get(code.as_str())
            .await
            .map(|entry| entry.value))
    }

    async fn set_link(&self, code: &ShortCode, entry: &CachedLink, ttl: Duration) -> Result<()> {
        self.links
            .insert(
                code.as_str().to_string(),
                TtlEntry {
                    value: entry.clone(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn del_link(&self, code: &ShortCode) -> Result<()> {
        self.links.invalidate(code.as_str()).await;
        Ok(())
    }

    async fn get_search(&self, url: &str) -> Result<Option<SearchEntry>> {
        trace!(url = %url, "fetching search entry from Moka cache");
        Ok(self.searches.get(url).await.map(|entry| entry.value))
    }

    async fn set_search(&self, url: &str, entry: &SearchEntry, ttl: Duration) -> Result<()> {
        self.searches
            .insert(
                url.to_string(),
                TtlEntry {
                    value: entry.clone(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn del_search(&self, url: &str) -> Result<()> {
        self.searches.invalidate(url).await;
        Ok(())
    }

    async fn get_daily(&self, code: &ShortCode) -> Result<Option<Vec<DayCount>>> {
        Ok(self
            .daily
            .get(code.as_str())
            .await
            .map(|entry| entry.value))
    }

    async fn set_daily(&self, code: &ShortCode, counts: &[DayCount], ttl: Duration) -> Result<()> {
        self.daily
            .insert(
                code.as_str().to_string(),
                TtlEntry {
                    value: counts.to_vec(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn del_daily(&self, code: &ShortCode) -> Result<()> {
        self.daily.invalidate(code.as_str()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn link_entry(url: &str) -> CachedLink {
        CachedLink {
            original_url: url.to_string(),
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn link_get_and_set() {
        let cache = MokaRedirectCache::new();
        let c = code("abc123");

        assert!(cache.get_link(&c).await.unwrap().is_none());

        cache
            .set_link(&c, &link_entry("https://example.com"), TTL)
            .await
            .unwrap();

        let entry = cache.get_link(&c).await.unwrap().unwrap();
        assert_eq!(entry.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn del_link_is_idempotent() {
        let cache = MokaRedirectCache::new();
        let c = code("abc123");

        cache.del_link(&c).await.unwrap();

        cache
            .set_link(&c, &link_entry("https://example.com"), TTL)
            .await
            .unwrap();
        cache.del_link(&c).await.unwrap();
        cache.del_link(&c).await.unwrap();

        assert!(cache.get_link(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_honor_per_write_ttl() {
        let cache = MokaRedirectCache::new();
        let c = code("abc123");

        cache
            .set_link(&c, &link_entry("https://example.com"), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.get_link(&c).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get_link(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn namespaces_are_independent() {
        let cache = MokaRedirectCache::new();
        let c = code("abc123");

        cache
            .set_link(&c, &link_entry("https://example.com"), TTL)
            .await
            .unwrap();
        cache
            .set_search(
                "https://example.com",
                &SearchEntry {
                    short_code: "abc123".to_string(),
                    original_url: "https://example.com".to_string(),
                },
                TTL,
            )
            .await
            .unwrap();

        cache.del_link(&c).await.unwrap();

        // The search entry survives link invalidation.
        assert!(cache.get_link(&c).await.unwrap().is_none());
        assert!(cache
            .get_search("https://example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn daily_counts_round_trip() {
        let cache = MokaRedirectCache::new();
        let c = code("abc123");
        let counts = vec![
            DayCount {
                day: "2024-06-01".to_string(),
                count: 3,
            },
            DayCount {
                day: "2024-06-02".to_string(),
                count: 1,
            },
        ];

        cache.set_daily(&c, &counts, TTL).await.unwrap();
        assert_eq!(cache.get_daily(&c).await.unwrap().unwrap(), counts);

        cache.del_daily(&c).await.unwrap();
        assert!(cache.get_daily(&c).await.unwrap().is_none());
    }
}
