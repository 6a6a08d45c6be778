use crate::config::SweeperConfig;
use jiff::Timestamp;
use portkey_core::{
    ArchiveReason, Link, LinkRepository, Notifier, RedirectCache, StorageError, UserDirectory,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What one pass did. Links skipped because a concurrent write voided the
/// candidate are not counted anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub warned: usize,
    pub renewed: usize,
    pub expired: usize,
    pub unused: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.warned + self.renewed + self.expired + self.unused
    }
}

enum ExpireOutcome {
    Renewed,
    Archived,
    Skipped,
}

/// The periodic maintenance pass.
///
/// Constructed with the store, cache, notifier and user directory so one
/// tick can be driven synchronously in tests via [`run_once`]. In
/// production, [`run`] owns the timer loop until the shutdown signal
/// flips.
///
/// [`run_once`]: Sweeper::run_once
/// [`run`]: Sweeper::run
pub struct Sweeper<R, C, N, D> {
    repository: Arc<R>,
    cache: Arc<C>,
    notifier: Arc<N>,
    directory: Arc<D>,
    config: SweeperConfig,
}

impl<R, C, N, D> Sweeper<R, C, N, D>
where
    R: LinkRepository,
    C: RedirectCache,
    N: Notifier,
    D: UserDirectory,
{
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        notifier: Arc<N>,
        directory: Arc<D>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            notifier,
            directory,
            config,
        }
    }

    /// Runs passes on the configured interval until `shutdown` flips.
    ///
    /// Pass failures are logged and never break the loop.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval = ?self.config.tick_interval, "sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_once().await;
                    if report.total() > 0 {
                        info!(
                            warned = report.warned,
                            renewed = report.renewed,
                            expired = report.expired,
                            unused = report.unused,
                            "sweep pass complete"
                        );
                    } else {
                        debug!("sweep pass complete, nothing to do");
                    }
                }
                _ = shutdown.changed() => {
                    info!("sweeper shutting down");
                    break;
                }
            }
        }
    }

    /// One full pass: warn, expire/renew, archive unused, invalidate.
    ///
    /// Errors are isolated per phase and per link; the pass always runs to
    /// the end and reports what it managed to do.
    pub async fn run_once(&self) -> SweepReport {
        let now = Timestamp::now();
        let mut report = SweepReport::default();

        // Warn phase: owners of links lapsing within the window.
        match self
            .repository
            .get_expiring(now, now + self.config.warn_window)
            .await
        {
            Ok(links) => {
                for link in &links {
                    if self.warn_owner(link).await {
                        report.warned += 1;
                    }
                }
            }
            Err(e) => error!(error = %e, "expiring-links query failed, skipping warn phase"),
        }

        // Expire phase: renew or archive lapsed links.
        match self.repository.get_expired(now).await {
            Ok(links) => {
                for link in &links {
                    match self.expire_one(link, now).await {
                        Ok(ExpireOutcome::Renewed) => report.renewed += 1,
                        Ok(ExpireOutcome::Archived) => report.expired += 1,
                        Ok(ExpireOutcome::Skipped) => {}
                        Err(e) => {
                            warn!(code = %link.short_code, error = %e, "expire pass failed for link")
                        }
                    }
                }
            }
            Err(e) => error!(error = %e, "expired-links query failed, skipping expire phase"),
        }

        // Staleness phase: archive links nobody visits anymore.
        match self.repository.get_stale(now - self.config.unused_after).await {
            Ok(links) => {
                for link in &links {
                    match self
                        .repository
                        .archive_and_delete(link, ArchiveReason::Unused)
                        .await
                    {
                        Ok(true) => {
                            self.invalidate_archived(link).await;
                            info!(code = %link.short_code, "archived unused link");
                            report.unused += 1;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            warn!(code = %link.short_code, error = %e, "staleness pass failed for link")
                        }
                    }
                }
            }
            Err(e) => error!(error = %e, "stale-links query failed, skipping staleness phase"),
        }

        report
    }

    /// Best-effort warning; a failure is logged and never retried here.
    async fn warn_owner(&self, link: &Link) -> bool {
        let Some(owner_id) = link.owner_user_id else {
            return false;
        };

        let user = match self.directory.get_user(owner_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return false,
            Err(e) => {
                warn!(code = %link.short_code, error = %e, "owner lookup failed");
                return false;
            }
        };

        match self.notifier.send_expiry_warning(&user.email, link).await {
            Ok(()) => true,
            Err(e) => {
                warn!(code = %link.short_code, error = %e, "expiry warning delivery failed");
                false
            }
        }
    }

    async fn expire_one(&self, link: &Link, now: Timestamp) -> Result<ExpireOutcome, StorageError> {
        if link.auto_renew {
            let mut renewed = link.clone();
            renewed.expires_at = Some(now + self.config.renew_extension);
            self.repository.update(&renewed).await?;
            if let Err(e) = self.cache.del_link(&link.short_code).await {
                warn!(code = %link.short_code, error = %e, "link cache invalidation failed");
            }
            info!(code = %link.short_code, expires_at = ?renewed.expires_at, "auto-renewed link");
            return Ok(ExpireOutcome::Renewed);
        }

        if self
            .repository
            .archive_and_delete(link, ArchiveReason::Expired)
            .await?
        {
            self.invalidate_archived(link).await;
            info!(code = %link.short_code, "archived expired link");
            Ok(ExpireOutcome::Archived)
        } else {
            Ok(ExpireOutcome::Skipped)
        }
    }

    /// Archival is a deletion: both the code entry and the reverse-search
    /// entry go.
    async fn invalidate_archived(&self, link: &Link) {
        if let Err(e) = self.cache.del_link(&link.short_code).await {
            warn!(code = %link.short_code, error = %e, "link cache invalidation failed");
        }
        if let Err(e) = self.cache.del_search(&link.original_url).await {
            warn!(url = %link.original_url, error = %e, "search cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::SignedDuration;
    use portkey_cache::MokaRedirectCache;
    use portkey_core::{
        CachedLink, LogNotifier, NewVisit, NotifyError, Role, ShortCode, User,
    };
    use portkey_storage::{InMemoryRepository, InMemoryUserDirectory};
    use std::sync::Mutex;
    use std::time::Duration;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn link(id: i64, s: &str, created_at: Timestamp) -> Link {
        Link {
            id,
            short_code: code(s),
            original_url: format!("https://example.com/{s}"),
            custom_alias: None,
            project: None,
            created_at,
            expires_at: None,
            visits: 0,
            last_visited_at: None,
            auto_renew: false,
            owner_user_id: None,
        }
    }

    type TestSweeper =
        Sweeper<InMemoryRepository, MokaRedirectCache, RecordingNotifier, InMemoryUserDirectory>;

    /// Notifier double that records every warning it was asked to send.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_expiry_warning(&self, email: &str, link: &Link) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Delivery("smtp unreachable".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((email.to_string(), link.short_code.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        cache: Arc<MokaRedirectCache>,
        notifier: Arc<RecordingNotifier>,
        directory: Arc<InMemoryUserDirectory>,
        sweeper: TestSweeper,
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingNotifier::default())
    }

    fn fixture_with(notifier: RecordingNotifier) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(MokaRedirectCache::new());
        let notifier = Arc::new(notifier);
        let directory = Arc::new(InMemoryUserDirectory::new());
        let sweeper = Sweeper::new(
            repo.clone(),
            cache.clone(),
            notifier.clone(),
            directory.clone(),
            SweeperConfig::default(),
        );
        Fixture {
            repo,
            cache,
            notifier,
            directory,
            sweeper,
        }
    }

    #[tokio::test]
    async fn expired_link_is_archived_with_reason_expired() {
        let f = fixture();
        let now = Timestamp::now();

        let mut lapsed = link(1, "lapsed", now - SignedDuration::from_hours(48));
        lapsed.expires_at = Some(now - SignedDuration::from_hours(1));
        f.repo.insert(lapsed).unwrap();

        let report = f.sweeper.run_once().await;
        assert_eq!(report.expired, 1);

        assert!(f.repo.get_by_short_code(&code("lapsed")).await.unwrap().is_none());
        let archives = f.repo.archives_for(&code("lapsed")).await.unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].reason, ArchiveReason::Expired);
    }

    #[tokio::test]
    async fn auto_renew_pushes_expiry_instead_of_archiving() {
        let f = fixture();
        let now = Timestamp::now();

        let mut renewing = link(1, "renews", now - SignedDuration::from_hours(48));
        renewing.expires_at = Some(now - SignedDuration::from_hours(1));
        renewing.auto_renew = true;
        f.repo.insert(renewing).unwrap();

        let report = f.sweeper.run_once().await;
        assert_eq!(report.renewed, 1);
        assert_eq!(report.expired, 0);

        let row = f.repo.get_by_short_code(&code("renews")).await.unwrap().unwrap();
        let expires_at = row.expires_at.unwrap();
        assert!(expires_at > now + SignedDuration::from_hours(24 * 6));
        assert!(expires_at <= now + SignedDuration::from_hours(24 * 7 + 1));
        assert!(f.repo.archives_for(&code("renews")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_link_is_archived_as_unused_after_thirty_days() {
        let f = fixture();
        let now = Timestamp::now();

        f.repo
            .insert(link(1, "dusty1", now - SignedDuration::from_hours(24 * 31)))
            .unwrap();
        f.repo
            .insert(link(2, "fresh1", now - SignedDuration::from_hours(24 * 29)))
            .unwrap();

        let report = f.sweeper.run_once().await;
        assert_eq!(report.unused, 1);

        assert!(f.repo.get_by_short_code(&code("dusty1")).await.unwrap().is_none());
        let archives = f.repo.archives_for(&code("dusty1")).await.unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].reason, ArchiveReason::Unused);

        // The 29-day-old link survives.
        assert!(f.repo.get_by_short_code(&code("fresh1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn recent_visit_saves_an_old_link_from_staleness() {
        let f = fixture();
        let now = Timestamp::now();

        let old = link(1, "beaten", now - SignedDuration::from_hours(24 * 90));
        f.repo.insert(old).unwrap();
        f.repo
            .record_visit(1, NewVisit::at(now, None, None))
            .await
            .unwrap();

        let report = f.sweeper.run_once().await;
        assert_eq!(report.unused, 0);
        assert!(f.repo.get_by_short_code(&code("beaten")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn owners_of_soon_expiring_links_are_warned() {
        let f = fixture();
        let now = Timestamp::now();

        f.directory.insert(User {
            id: 7,
            email: "owner@example.com".to_string(),
            role: Role::User,
        });

        let mut soon = link(1, "soon01", now - SignedDuration::from_hours(1));
        soon.expires_at = Some(now + SignedDuration::from_hours(12));
        soon.owner_user_id = Some(7);
        f.repo.insert(soon).unwrap();

        // Outside the 24h window: no warning.
        let mut later = link(2, "later1", now - SignedDuration::from_hours(1));
        later.expires_at = Some(now + SignedDuration::from_hours(48));
        later.owner_user_id = Some(7);
        f.repo.insert(later).unwrap();

        // Anonymous: no owner to warn.
        let mut orphan = link(3, "orphan", now - SignedDuration::from_hours(1));
        orphan.expires_at = Some(now + SignedDuration::from_hours(12));
        f.repo.insert(orphan).unwrap();

        let report = f.sweeper.run_once().await;
        assert_eq!(report.warned, 1);

        let sent = f.notifier.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("owner@example.com".to_string(), "soon01".to_string())]);
    }

    #[tokio::test]
    async fn notification_failure_never_aborts_the_pass() {
        let f = fixture_with(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let now = Timestamp::now();

        f.directory.insert(User {
            id: 7,
            email: "owner@example.com".to_string(),
            role: Role::User,
        });

        let mut soon = link(1, "soon01", now - SignedDuration::from_hours(1));
        soon.expires_at = Some(now + SignedDuration::from_hours(12));
        soon.owner_user_id = Some(7);
        f.repo.insert(soon).unwrap();

        let mut lapsed = link(2, "lapsed", now - SignedDuration::from_hours(48));
        lapsed.expires_at = Some(now - SignedDuration::from_hours(1));
        f.repo.insert(lapsed).unwrap();

        // The warn failure is swallowed and the expire phase still runs.
        let report = f.sweeper.run_once().await;
        assert_eq!(report.warned, 0);
        assert_eq!(report.expired, 1);
    }

    #[tokio::test]
    async fn archival_invalidates_the_redirect_cache() {
        let f = fixture();
        let now = Timestamp::now();

        let mut lapsed = link(1, "lapsed", now - SignedDuration::from_hours(48));
        lapsed.expires_at = Some(now - SignedDuration::from_hours(1));
        f.repo.insert(lapsed).unwrap();

        f.cache
            .set_link(
                &code("lapsed"),
                &CachedLink {
                    original_url: "https://example.com/lapsed".to_string(),
                },
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        f.sweeper.run_once().await;

        assert!(f.cache.get_link(&code("lapsed")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let repo = Arc::new(InMemoryRepository::new());
        let sweeper = Sweeper::new(
            repo,
            Arc::new(MokaRedirectCache::new()),
            Arc::new(LogNotifier),
            Arc::new(InMemoryUserDirectory::new()),
            SweeperConfig::builder()
                .tick_interval(Duration::from_millis(10))
                .build(),
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper.run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper loop must stop on shutdown")
            .unwrap();
    }
}
