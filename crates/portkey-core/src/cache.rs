use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Cached payload for a `link:<code>` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLink {
    pub original_url: String,
}

/// Cached payload for a `search:<url>` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub short_code: String,
    pub original_url: String,
}

/// One day's visit count, `day` being a `YYYY-MM-DD` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

/// TTLs for the three cache namespaces, with the documented defaults.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    /// `link:<code>` entries.
    pub link: Duration,
    /// `search:<url>` entries.
    pub search: Duration,
    /// `analytics:daily:<code>` entries.
    pub daily: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            link: Duration::from_secs(3600),
            search: Duration::from_secs(600),
            daily: Duration::from_secs(3600),
        }
    }
}

/// The redirect-path cache.
///
/// Three logical namespaces keyed by short code or original URL. The cache
/// is advisory: callers treat every `Err` as a miss (logged, never
/// propagated), and the system stays correct with the cache absent
/// entirely. Writes happen only after the store write they reflect has
/// committed. Invalidation is explicit and caller-driven.
#[async_trait]
pub trait RedirectCache: Send + Sync + 'static {
    /// `link:<code>` — the redirect target.
    async fn get_link(&self, code: &ShortCode) -> Result<Option<CachedLink>>;

    async fn set_link(&self, code: &ShortCode, entry: &CachedLink, ttl: Duration) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn del_link(&self, code: &ShortCode) -> Result<()>;

    /// `search:<url>` — reverse lookup by original URL.
    async fn get_search(&self, url: &str) -> Result<Option<SearchEntry>>;

    async fn set_search(&self, url: &str, entry: &SearchEntry, ttl: Duration) -> Result<()>;

    async fn del_search(&self, url: &str) -> Result<()>;

    /// `analytics:daily:<code>` — precomputed daily visit counts.
    async fn get_daily(&self, code: &ShortCode) -> Result<Option<Vec<DayCount>>>;

    async fn set_daily(&self, code: &ShortCode, counts: &[DayCount], ttl: Duration) -> Result<()>;

    async fn del_daily(&self, code: &ShortCode) -> Result<()>;
}
