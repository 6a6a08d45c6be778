use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::Mutex;
use portkey_core::repository::Result;
use portkey_core::{
    ArchiveReason, ArchiveRecord, Link, LinkRepository, NewLink, NewVisit, ShortCode,
    StorageError, VisitRecord,
};
use std::collections::HashMap;

/// In-memory implementation of the repository contract.
///
/// All tables live behind one lock, so the multi-table operations
/// (`record_visit`, `archive_and_delete`) are exactly atomic: a reader
/// never observes a tombstone without the matching deletion or a visit
/// row without its counter bump.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    links: HashMap<i64, Link>,
    by_code: HashMap<String, i64>,
    visits: HashMap<i64, Vec<VisitRecord>>,
    archives: Vec<ArchiveRecord>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed link, keeping its `id` and timestamps.
    ///
    /// Seeding helper for tests that need links with a backdated
    /// `created_at` or a preset visit counter. Production code goes
    /// through [`LinkRepository::create`].
    pub fn insert(&self, link: Link) -> Result<()> {
        let mut state = self.state.lock();
        if state.by_code.contains_key(link.short_code.as_str()) {
            return Err(StorageError::Conflict(link.short_code.to_string()));
        }
        state.next_id = state.next_id.max(link.id + 1);
        state
            .by_code
            .insert(link.short_code.as_str().to_string(), link.id);
        state.links.insert(link.id, link);
        Ok(())
    }
}

#[async_trait]
impl LinkRepository for InMemoryRepository {
    async fn create(&self, link: NewLink) -> Result<Link> {
        let mut state = self.state.lock();
        if state.by_code.contains_key(link.short_code.as_str()) {
            return Err(StorageError::Conflict(link.short_code.to_string()));
        }

        state.next_id += 1;
        let row = Link {
            id: state.next_id,
            short_code: link.short_code,
            original_url: link.original_url,
            custom_alias: link.custom_alias,
            project: link.project,
            created_at: Timestamp::now(),
            expires_at: link.expires_at,
            visits: 0,
            last_visited_at: None,
            auto_renew: link.auto_renew,
            owner_user_id: link.owner_user_id,
        };
        state
            .by_code
            .insert(row.short_code.as_str().to_string(), row.id);
        state.links.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_by_short_code(&self, code: &ShortCode) -> Result<Option<Link>> {
        let state = self.state.lock();
        Ok(state
            .by_code
            .get(code.as_str())
            .and_then(|id| state.links.get(id))
            .cloned())
    }

    async fn get_by_original_url(&self, url: &str) -> Result<Option<Link>> {
        let state = self.state.lock();
        // Oldest match wins, mirroring the SQL backend's `ORDER BY id`.
        Ok(state
            .links
            .values()
            .filter(|link| link.original_url == url)
            .min_by_key(|link| link.id)
            .cloned())
    }

    async fn get_by_owner(&self, owner_user_id: i64) -> Result<Vec<Link>> {
        Ok(self.collect_sorted(|link| link.owner_user_id == Some(owner_user_id)))
    }

    async fn get_by_project(&self, project: &str) -> Result<Vec<Link>> {
        Ok(self.collect_sorted(|link| link.project.as_deref() == Some(project)))
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.state.lock().by_code.contains_key(code.as_str()))
    }

    async fn get_expired(&self, now: Timestamp) -> Result<Vec<Link>> {
        Ok(self.collect_sorted(|link| link.expires_at.is_some_and(|at| at <= now)))
    }

    async fn get_expiring(&self, now: Timestamp, until: Timestamp) -> Result<Vec<Link>> {
        Ok(self.collect_sorted(|link| {
            link.expires_at.is_some_and(|at| at > now && at <= until)
        }))
    }

    async fn get_stale(&self, cutoff: Timestamp) -> Result<Vec<Link>> {
        Ok(self.collect_sorted(|link| match link.last_visited_at {
            Some(visited) => visited < cutoff,
            None => link.created_at < cutoff,
        }))
    }

    async fn update(&self, link: &Link) -> Result<()> {
        let mut state = self.state.lock();
        let row = state
            .links
            .get_mut(&link.id)
            .ok_or_else(|| StorageError::NotFound(link.short_code.to_string()))?;
        row.original_url = link.original_url.clone();
        row.project = link.project.clone();
        row.expires_at = link.expires_at;
        row.auto_renew = link.auto_renew;
        Ok(())
    }

    async fn record_visit(&self, link_id: i64, visit: NewVisit) -> Result<()> {
        let mut state = self.state.lock();
        let row = state
            .links
            .get_mut(&link_id)
            .ok_or_else(|| StorageError::NotFound(format!("link id {link_id}")))?;
        row.visits += 1;
        row.last_visited_at = Some(visit.visited_at);
        state.visits.entry(link_id).or_default().push(VisitRecord {
            link_id,
            visited_at: visit.visited_at,
            day_bucket: visit.day_bucket,
            hour_bucket: visit.hour_bucket,
            client_ip: visit.client_ip,
            user_agent: visit.user_agent,
        });
        Ok(())
    }

    async fn archive_and_delete(&self, link: &Link, reason: ArchiveReason) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(removed) = state.links.remove(&link.id) else {
            return Ok(false);
        };

        // Sweeper candidates are re-validated under the lock: a concurrent
        // renew or visit since the candidate was read voids the removal.
        let still_valid = match reason {
            ArchiveReason::Expired => removed.expires_at == link.expires_at,
            ArchiveReason::Unused => removed.last_visited_at == link.last_visited_at,
            ArchiveReason::User | ArchiveReason::Admin => true,
        };
        if !still_valid {
            state.links.insert(removed.id, removed);
            return Ok(false);
        }

        state.by_code.remove(removed.short_code.as_str());
        state.visits.remove(&link.id);
        state.archives.push(ArchiveRecord {
            link_id: removed.id,
            short_code: removed.short_code.as_str().to_string(),
            original_url: removed.original_url,
            deleted_at: Timestamp::now(),
            reason,
        });
        Ok(true)
    }

    async fn get_visits(&self, link_id: i64) -> Result<Vec<VisitRecord>> {
        Ok(self
            .state
            .lock()
            .visits
            .get(&link_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn archives_for(&self, code: &ShortCode) -> Result<Vec<ArchiveRecord>> {
        Ok(self
            .state
            .lock()
            .archives
            .iter()
            .filter(|record| record.short_code == code.as_str())
            .cloned()
            .collect())
    }
}

impl InMemoryRepository {
    fn collect_sorted(&self, predicate: impl Fn(&Link) -> bool) -> Vec<Link> {
        let state = self.state.lock();
        let mut rows: Vec<Link> = state
            .links
            .values()
            .filter(|link| predicate(link))
            .cloned()
            .collect();
        rows.sort_by_key(|link| link.id);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn new_link(s: &str, url: &str) -> NewLink {
        NewLink {
            short_code: code(s),
            original_url: url.to_string(),
            custom_alias: None,
            project: None,
            expires_at: None,
            auto_renew: false,
            owner_user_id: None,
        }
    }

    fn visit_now() -> NewVisit {
        NewVisit::at(Timestamp::now(), Some("203.0.113.1".to_string()), None)
    }

    #[tokio::test]
    async fn create_assigns_ids_and_defaults() {
        let repo = InMemoryRepository::new();
        let a = repo.create(new_link("abc123", "https://a.example")).await.unwrap();
        let b = repo.create(new_link("def456", "https://b.example")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.visits, 0);
        assert!(a.last_visited_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_short_code_conflicts() {
        let repo = InMemoryRepository::new();
        repo.create(new_link("abc123", "https://a.example")).await.unwrap();

        let err = repo
            .create(new_link("abc123", "https://b.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn record_visit_bumps_counter_and_inserts_row() {
        let repo = InMemoryRepository::new();
        let link = repo.create(new_link("abc123", "https://a.example")).await.unwrap();

        repo.record_visit(link.id, visit_now()).await.unwrap();
        repo.record_visit(link.id, visit_now()).await.unwrap();

        let row = repo.get_by_short_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(row.visits, 2);
        assert!(row.last_visited_at.is_some());
        assert_eq!(repo.get_visits(link.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn record_visit_on_missing_link_fails() {
        let repo = InMemoryRepository::new();
        let err = repo.record_visit(99, visit_now()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn archive_removes_link_and_cascades_visits() {
        let repo = InMemoryRepository::new();
        let link = repo.create(new_link("abc123", "https://a.example")).await.unwrap();
        repo.record_visit(link.id, visit_now()).await.unwrap();
        let link = repo.get_by_short_code(&code("abc123")).await.unwrap().unwrap();

        let removed = repo.archive_and_delete(&link, ArchiveReason::User).await.unwrap();
        assert!(removed);

        assert!(repo.get_by_short_code(&code("abc123")).await.unwrap().is_none());
        assert!(repo.get_visits(link.id).await.unwrap().is_empty());

        let archives = repo.archives_for(&code("abc123")).await.unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].reason, ArchiveReason::User);
        assert_eq!(archives[0].original_url, "https://a.example");
    }

    #[tokio::test]
    async fn archive_guard_voids_stale_candidate() {
        let repo = InMemoryRepository::new();
        let link = repo.create(new_link("abc123", "https://a.example")).await.unwrap();

        // Candidate read before a visit lands.
        let candidate = repo.get_by_short_code(&code("abc123")).await.unwrap().unwrap();
        repo.record_visit(link.id, visit_now()).await.unwrap();

        let removed = repo
            .archive_and_delete(&candidate, ArchiveReason::Unused)
            .await
            .unwrap();
        assert!(!removed, "visited link must survive a stale unused-candidate");
        assert!(repo.get_by_short_code(&code("abc123")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_and_expiring_queries() {
        let repo = InMemoryRepository::new();
        let now = Timestamp::now();

        let mut lapsed = repo.create(new_link("lapsed", "https://a.example")).await.unwrap();
        lapsed.expires_at = Some(now - SignedDuration::from_secs(60));
        repo.update(&lapsed).await.unwrap();

        let mut soon = repo.create(new_link("soon01", "https://b.example")).await.unwrap();
        soon.expires_at = Some(now + SignedDuration::from_hours(12));
        repo.update(&soon).await.unwrap();

        repo.create(new_link("keeper", "https://c.example")).await.unwrap();

        let expired = repo.get_expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].short_code.as_str(), "lapsed");

        let expiring = repo
            .get_expiring(now, now + SignedDuration::from_hours(24))
            .await
            .unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].short_code.as_str(), "soon01");
    }

    #[tokio::test]
    async fn stale_query_uses_last_visit_else_created() {
        let repo = InMemoryRepository::new();
        let now = Timestamp::now();
        let cutoff = now - SignedDuration::from_hours(24 * 30);

        let old_untouched = Link {
            id: 1,
            short_code: code("old001"),
            original_url: "https://a.example".to_string(),
            custom_alias: None,
            project: None,
            created_at: now - SignedDuration::from_hours(24 * 31),
            expires_at: None,
            visits: 0,
            last_visited_at: None,
            auto_renew: false,
            owner_user_id: None,
        };
        repo.insert(old_untouched).unwrap();

        let old_but_visited = Link {
            id: 2,
            short_code: code("old002"),
            original_url: "https://b.example".to_string(),
            custom_alias: None,
            project: None,
            created_at: now - SignedDuration::from_hours(24 * 31),
            expires_at: None,
            visits: 5,
            last_visited_at: Some(now - SignedDuration::from_hours(1)),
            auto_renew: false,
            owner_user_id: None,
        };
        repo.insert(old_but_visited).unwrap();

        let stale = repo.get_stale(cutoff).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].short_code.as_str(), "old001");
    }

    #[tokio::test]
    async fn owner_and_project_lookups() {
        let repo = InMemoryRepository::new();

        let mut mine = new_link("mine01", "https://a.example");
        mine.owner_user_id = Some(7);
        mine.project = Some("launch".to_string());
        repo.create(mine).await.unwrap();

        let mut other = new_link("other1", "https://b.example");
        other.owner_user_id = Some(8);
        repo.create(other).await.unwrap();

        let owned = repo.get_by_owner(7).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].short_code.as_str(), "mine01");

        let in_project = repo.get_by_project("launch").await.unwrap();
        assert_eq!(in_project.len(), 1);
        assert_eq!(in_project[0].short_code.as_str(), "mine01");

        assert!(repo.get_by_project("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_leaves_counters_alone() {
        let repo = InMemoryRepository::new();
        let link = repo.create(new_link("abc123", "https://a.example")).await.unwrap();
        repo.record_visit(link.id, visit_now()).await.unwrap();

        // Update from the pre-visit snapshot; the counter must survive.
        let mut snapshot = link.clone();
        snapshot.original_url = "https://moved.example".to_string();
        repo.update(&snapshot).await.unwrap();

        let row = repo.get_by_short_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(row.original_url, "https://moved.example");
        assert_eq!(row.visits, 1);
    }
}
