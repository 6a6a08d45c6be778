use crate::error::ShortenError;
use async_trait::async_trait;
use jiff::Timestamp;
use portkey_core::{Link, LinkPatch, SearchEntry, ShortCode, User};

type Result<T> = std::result::Result<T, ShortenError>;

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// Optional user-chosen alias; becomes the short code when accepted.
    pub custom_alias: Option<String>,
    /// When the link lapses; `None` means it never expires.
    pub expires_at: Option<Timestamp>,
    /// Free-text grouping label.
    pub project: Option<String>,
    /// Whether the sweeper renews the link instead of archiving it.
    pub auto_renew: bool,
    /// Owning user, `None` for anonymous links.
    pub owner_user_id: Option<i64>,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a shortened URL and returns the stored link.
    async fn shorten(&self, params: ShortenParams) -> Result<Link>;

    /// Fetches a link's full state by short code.
    async fn get(&self, code: &ShortCode) -> Result<Link>;

    /// Reverse lookup: finds the short code for an original URL.
    async fn search(&self, original_url: &str) -> Result<Option<SearchEntry>>;

    /// Applies a partial update. Owned links require the owner or an admin.
    async fn update(&self, code: &ShortCode, patch: LinkPatch, caller: Option<&User>)
        -> Result<Link>;

    /// Archives and removes a link. Owned links require the owner or an
    /// admin; the tombstone records who drove the removal.
    async fn delete(&self, code: &ShortCode, caller: Option<&User>) -> Result<()>;
}
