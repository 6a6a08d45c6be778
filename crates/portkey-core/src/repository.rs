use crate::error::StorageError;
use crate::link::{ArchiveReason, ArchiveRecord, Link, NewLink};
use crate::shortcode::ShortCode;
use crate::visit::{NewVisit, VisitRecord};
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The durable link store.
///
/// The store is the single authority for short-code uniqueness and for
/// per-link write ordering. Every mutation is transactional: a crash mid
/// operation leaves either the pre- or the post-state, never a partial one.
#[async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    /// Persists a new link, assigning `id` and `created_at`.
    ///
    /// Returns `Err(Conflict)` when the short code is already live. The
    /// uniqueness check is constraint-backed, not a pre-check: concurrent
    /// inserts of the same code serialize here and the second one loses.
    async fn create(&self, link: NewLink) -> Result<Link>;

    async fn get_by_short_code(&self, code: &ShortCode) -> Result<Option<Link>>;

    async fn get_by_original_url(&self, url: &str) -> Result<Option<Link>>;

    async fn get_by_owner(&self, owner_user_id: i64) -> Result<Vec<Link>>;

    async fn get_by_project(&self, project: &str) -> Result<Vec<Link>>;

    /// Checks whether a short code is currently live.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Links whose `expires_at` has passed as of `now`.
    async fn get_expired(&self, now: Timestamp) -> Result<Vec<Link>>;

    /// Links expiring in the window `(now, until]` — still alive, but soon
    /// to lapse. Feeds the sweeper's warn phase.
    async fn get_expiring(&self, now: Timestamp, until: Timestamp) -> Result<Vec<Link>>;

    /// Links with no visit since `cutoff`: `last_visited_at < cutoff`, or no
    /// visit ever and `created_at < cutoff`.
    async fn get_stale(&self, cutoff: Timestamp) -> Result<Vec<Link>>;

    /// Persists the caller-mutable policy fields of `link`: `original_url`,
    /// `project`, `expires_at`, `auto_renew`. The visit counters are owned
    /// by [`record_visit`](Self::record_visit) and are not written here, so
    /// a concurrent redirect can never be clobbered by an update.
    async fn update(&self, link: &Link) -> Result<()>;

    /// Atomically inserts the visit row, increments `visits` by one at the
    /// store (`visits = visits + 1`, never read-modify-write) and sets
    /// `last_visited_at = visit.visited_at`, all in one transaction.
    ///
    /// Returns `Err(NotFound)` when the link vanished between the caller's
    /// lookup and this write.
    async fn record_visit(&self, link_id: i64, visit: NewVisit) -> Result<()>;

    /// Atomically writes the tombstone and removes the link together with
    /// its visit rows (cascade).
    ///
    /// For the sweeper reasons (`Expired`, `Unused`) the removal re-checks,
    /// inside the transaction, that the condition fields are unchanged since
    /// the candidate was read; returns `Ok(false)` without archiving when a
    /// concurrent write invalidated the candidate. `User`/`Admin` removals
    /// carry no guard.
    async fn archive_and_delete(&self, link: &Link, reason: ArchiveReason) -> Result<bool>;

    /// All visit rows for a link, in insertion order.
    async fn get_visits(&self, link_id: i64) -> Result<Vec<VisitRecord>>;

    /// Tombstones recorded for a short code, oldest first.
    async fn archives_for(&self, code: &ShortCode) -> Result<Vec<ArchiveRecord>>;
}
