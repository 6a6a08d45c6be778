use crate::allocator::CodeAllocator;
use crate::error::ShortenError;
use crate::shortener::{ShortenParams, Shortener};
use async_trait::async_trait;
use portkey_core::{
    ArchiveReason, CacheTtls, Link, LinkPatch, LinkRepository, NewLink, RedirectCache,
    SearchEntry, ShortCode, User,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, ShortenError>;

/// A concrete implementation of the [`Shortener`] trait.
///
/// Wraps a repository, a cache and a [`CodeAllocator`] to handle code
/// assignment, URL validation, ownership enforcement and the cache
/// invalidation that every mutation owes the redirect path.
#[derive(Debug, Clone)]
pub struct ShortenerService<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    allocator: CodeAllocator,
    ttls: CacheTtls,
}

impl<R: LinkRepository, C: RedirectCache> ShortenerService<R, C> {
    /// Creates a service with the default allocator and TTLs.
    pub fn new(repository: Arc<R>, cache: Arc<C>) -> Self {
        Self::with_config(repository, cache, CodeAllocator::default(), CacheTtls::default())
    }

    pub fn with_config(
        repository: Arc<R>,
        cache: Arc<C>,
        allocator: CodeAllocator,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            repository,
            cache,
            allocator,
            ttls,
        }
    }

    /// Validates that the URL has an http(s) scheme and a host.
    fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ShortenError::InvalidUrl("URL cannot be empty".to_string()));
        }

        let parts: Vec<&str> = url.split("://").collect();
        if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(ShortenError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        }

        let scheme = parts[0].to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ShortenError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                scheme
            )));
        }

        Ok(())
    }

    /// Owned links may only be touched by their owner or an admin.
    /// Anonymous links carry no ownership and are open to any caller.
    fn authorize(link: &Link, caller: Option<&User>) -> Result<()> {
        let Some(owner) = link.owner_user_id else {
            return Ok(());
        };
        match caller {
            Some(user) if user.id == owner || user.is_admin() => Ok(()),
            _ => Err(ShortenError::Forbidden),
        }
    }

    async fn invalidate_link_entries(&self, code: &ShortCode, url: &str) {
        if let Err(e) = self.cache.del_link(code).await {
            warn!(code = %code, error = %e, "link cache invalidation failed");
        }
        if let Err(e) = self.cache.del_search(url).await {
            warn!(url = %url, error = %e, "search cache invalidation failed");
        }
    }
}

#[async_trait]
impl<R: LinkRepository, C: RedirectCache> Shortener for ShortenerService<R, C> {
    async fn shorten(&self, params: ShortenParams) -> Result<Link> {
        Self::validate_url(&params.original_url)?;

        let short_code = match &params.custom_alias {
            Some(alias) => {
                let code = ShortCode::new(alias.clone())?;
                // Pre-check narrows the race window; the store's unique
                // index settles concurrent inserts of the same alias.
                if self.repository.exists(&code).await? {
                    return Err(ShortenError::AliasTaken(alias.clone()));
                }
                code
            }
            None => self.allocator.allocate(self.repository.as_ref()).await?,
        };

        let link = self
            .repository
            .create(NewLink {
                short_code,
                original_url: params.original_url,
                custom_alias: params.custom_alias,
                project: params.project,
                expires_at: params.expires_at,
                auto_renew: params.auto_renew,
                owner_user_id: params.owner_user_id,
            })
            .await?;

        info!(code = %link.short_code, owner = ?link.owner_user_id, "link created");
        Ok(link)
    }

    async fn get(&self, code: &ShortCode) -> Result<Link> {
        self.repository
            .get_by_short_code(code)
            .await?
            .ok_or_else(|| ShortenError::NotFound(code.to_string()))
    }

    async fn search(&self, original_url: &str) -> Result<Option<SearchEntry>> {
        match self.cache.get_search(original_url).await {
            Ok(Some(entry)) => {
                debug!(url = %original_url, "search cache hit");
                return Ok(Some(entry));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %original_url, error = %e, "search cache probe failed, falling through");
            }
        }

        let Some(link) = self.repository.get_by_original_url(original_url).await? else {
            return Ok(None);
        };

        let entry = SearchEntry {
            short_code: link.short_code.as_str().to_string(),
            original_url: link.original_url,
        };
        if let Err(e) = self
            .cache
            .set_search(original_url, &entry, self.ttls.search)
            .await
        {
            warn!(url = %original_url, error = %e, "search cache populate failed");
        }
        Ok(Some(entry))
    }

    async fn update(
        &self,
        code: &ShortCode,
        patch: LinkPatch,
        caller: Option<&User>,
    ) -> Result<Link> {
        let mut link = self.get(code).await?;
        Self::authorize(&link, caller)?;

        let old_url = link.original_url.clone();
        if let Some(original_url) = patch.original_url {
            Self::validate_url(&original_url)?;
            link.original_url = original_url;
        }
        if let Some(expires_at) = patch.expires_at {
            link.expires_at = Some(expires_at);
        }
        if let Some(project) = patch.project {
            link.project = Some(project);
        }

        self.repository.update(&link).await?;

        // Drop the stale entries only after the store write committed.
        self.invalidate_link_entries(code, &old_url).await;
        if link.original_url != old_url {
            if let Err(e) = self.cache.del_search(&link.original_url).await {
                warn!(url = %link.original_url, error = %e, "search cache invalidation failed");
            }
        }

        info!(code = %code, "link updated");
        Ok(link)
    }

    async fn delete(&self, code: &ShortCode, caller: Option<&User>) -> Result<()> {
        let link = self.get(code).await?;
        Self::authorize(&link, caller)?;

        let reason = match caller {
            Some(user) if user.is_admin() && link.owner_user_id != Some(user.id) => {
                ArchiveReason::Admin
            }
            _ => ArchiveReason::User,
        };

        self.repository.archive_and_delete(&link, reason).await?;
        self.invalidate_link_entries(code, &link.original_url).await;

        info!(code = %code, reason = %reason, "link deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portkey_cache::MokaRedirectCache;
    use portkey_core::Role;
    use portkey_storage::InMemoryRepository;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn params(url: &str) -> ShortenParams {
        ShortenParams {
            original_url: url.to_string(),
            custom_alias: None,
            expires_at: None,
            project: None,
            auto_renew: false,
            owner_user_id: None,
        }
    }

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            role,
        }
    }

    fn test_service() -> ShortenerService<InMemoryRepository, MokaRedirectCache> {
        ShortenerService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(MokaRedirectCache::new()),
        )
    }

    #[tokio::test]
    async fn shorten_with_auto_generated_code() {
        let service = test_service();

        let link = service.shorten(params("https://example.com")).await.unwrap();
        assert_eq!(link.short_code.as_str().len(), 6);
        assert_eq!(link.original_url, "https://example.com");
        assert_eq!(link.visits, 0);
    }

    #[tokio::test]
    async fn shorten_with_custom_alias() {
        let service = test_service();

        let mut p = params("https://example.com");
        p.custom_alias = Some("my-alias".to_string());

        let link = service.shorten(p).await.unwrap();
        assert_eq!(link.short_code.as_str(), "my-alias");
        assert_eq!(link.custom_alias.as_deref(), Some("my-alias"));
    }

    #[tokio::test]
    async fn shorten_with_duplicate_alias_fails() {
        let service = test_service();

        let mut first = params("https://example1.com");
        first.custom_alias = Some("my-alias".to_string());
        let mut second = params("https://example2.com");
        second.custom_alias = Some("my-alias".to_string());

        service.shorten(first).await.unwrap();
        let err = service.shorten(second).await.unwrap_err();
        assert!(matches!(err, ShortenError::AliasTaken(_)));
    }

    #[tokio::test]
    async fn shorten_with_invalid_url_fails() {
        let service = test_service();

        let err = service.shorten(params("not-a-valid-url")).await.unwrap_err();
        assert!(matches!(err, ShortenError::InvalidUrl(_)));

        let err = service.shorten(params("ftp://example.com")).await.unwrap_err();
        assert!(matches!(err, ShortenError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn shorten_with_invalid_alias_fails() {
        let service = test_service();

        let mut p = params("https://example.com");
        p.custom_alias = Some("a b".to_string());

        let err = service.shorten(p).await.unwrap_err();
        assert!(matches!(err, ShortenError::InvalidShortCode(_)));
    }

    #[tokio::test]
    async fn search_finds_shortened_url() {
        let service = test_service();

        let mut p = params("https://example.com/page");
        p.custom_alias = Some("abc123".to_string());
        service.shorten(p).await.unwrap();

        let hit = service.search("https://example.com/page").await.unwrap().unwrap();
        assert_eq!(hit.short_code, "abc123");

        assert!(service.search("https://other.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_changes_url_and_invalidates_search() {
        let service = test_service();

        let mut p = params("https://example.com/old");
        p.custom_alias = Some("abc123".to_string());
        service.shorten(p).await.unwrap();

        // Warm the search cache for the old URL.
        service.search("https://example.com/old").await.unwrap();

        let patch = LinkPatch {
            original_url: Some("https://example.com/new".to_string()),
            ..Default::default()
        };
        let updated = service.update(&code("abc123"), patch, None).await.unwrap();
        assert_eq!(updated.original_url, "https://example.com/new");

        // The old search entry must be gone from the cache; a fresh search
        // resolves nothing for the old URL.
        assert!(service.search("https://example.com/old").await.unwrap().is_none());
        let hit = service.search("https://example.com/new").await.unwrap().unwrap();
        assert_eq!(hit.short_code, "abc123");
    }

    #[tokio::test]
    async fn owned_link_rejects_strangers() {
        let service = test_service();

        let mut p = params("https://example.com");
        p.custom_alias = Some("abc123".to_string());
        p.owner_user_id = Some(1);
        service.shorten(p).await.unwrap();

        let stranger = user(2, Role::User);
        let err = service
            .delete(&code("abc123"), Some(&stranger))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenError::Forbidden));

        let err = service.delete(&code("abc123"), None).await.unwrap_err();
        assert!(matches!(err, ShortenError::Forbidden));
    }

    #[tokio::test]
    async fn owner_can_delete_and_archive_records_it() {
        let service = test_service();

        let mut p = params("https://example.com");
        p.custom_alias = Some("abc123".to_string());
        p.owner_user_id = Some(1);
        service.shorten(p).await.unwrap();

        let owner = user(1, Role::User);
        service.delete(&code("abc123"), Some(&owner)).await.unwrap();

        let err = service.get(&code("abc123")).await.unwrap_err();
        assert!(matches!(err, ShortenError::NotFound(_)));
    }

    #[tokio::test]
    async fn admin_delete_is_archived_as_admin() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ShortenerService::new(repo.clone(), Arc::new(MokaRedirectCache::new()));

        let mut p = params("https://example.com");
        p.custom_alias = Some("abc123".to_string());
        p.owner_user_id = Some(1);
        service.shorten(p).await.unwrap();

        let admin = user(99, Role::Admin);
        service.delete(&code("abc123"), Some(&admin)).await.unwrap();

        let archives = repo.archives_for(&code("abc123")).await.unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].reason, ArchiveReason::Admin);
    }

    #[tokio::test]
    async fn update_rejects_non_owner() {
        let service = test_service();

        let mut p = params("https://example.com");
        p.custom_alias = Some("abc123".to_string());
        p.owner_user_id = Some(1);
        service.shorten(p).await.unwrap();

        let patch = LinkPatch {
            project: Some("campaign".to_string()),
            ..Default::default()
        };
        let err = service
            .update(&code("abc123"), patch, Some(&user(2, Role::User)))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenError::Forbidden));
    }
}
