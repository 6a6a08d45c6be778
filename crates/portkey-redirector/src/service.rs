use crate::error::RedirectError;
use crate::redirector::{Redirect, Redirector, VisitContext};
use async_trait::async_trait;
use jiff::Timestamp;
use portkey_core::{
    CacheTtls, CachedLink, LinkRepository, NewVisit, RedirectCache, ShortCode, StorageError,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, RedirectError>;

/// Service for handling URL redirects.
///
/// The state machine per request: cache probe (errors count as misses),
/// authoritative store lookup, expiry check, atomic visit recording, then
/// cache populate only when the probe missed. Expired rows are left in
/// place for the sweeper; this service never archives.
#[derive(Debug, Clone)]
pub struct RedirectorService<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    ttls: CacheTtls,
}

impl<R: LinkRepository, C: RedirectCache> RedirectorService<R, C> {
    /// Creates a new service with the default cache TTLs.
    pub fn new(repository: Arc<R>, cache: Arc<C>) -> Self {
        Self::with_ttls(repository, cache, CacheTtls::default())
    }

    pub fn with_ttls(repository: Arc<R>, cache: Arc<C>, ttls: CacheTtls) -> Self {
        Self {
            repository,
            cache,
            ttls,
        }
    }
}

#[async_trait]
impl<R: LinkRepository, C: RedirectCache> Redirector for RedirectorService<R, C> {
    async fn redirect(&self, code: &ShortCode, visit: VisitContext) -> Result<Redirect> {
        trace!(code = %code, "resolving short code");

        // CacheProbe. A failing cache is a miss, never a request failure.
        let probe = match self.cache.get_link(code).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(code = %code, error = %e, "cache probe failed, treating as miss");
                None
            }
        };

        // StoreLookup, unconditionally: the visit bookkeeping needs the
        // authoritative row even when the probe hit.
        let link = self
            .repository
            .get_by_short_code(code)
            .await?
            .ok_or_else(|| RedirectError::NotFound(code.to_string()))?;

        let now = Timestamp::now();
        if link.is_expired(now) {
            // The row stays for the sweeper to archive.
            debug!(code = %code, "link has expired");
            return Err(RedirectError::Gone(code.to_string()));
        }

        self.repository
            .record_visit(
                link.id,
                NewVisit::at(now, visit.client_ip, visit.user_agent),
            )
            .await
            .map_err(|e| match e {
                // The link vanished between lookup and write; to the
                // client that is indistinguishable from a dead code.
                StorageError::NotFound(_) => RedirectError::NotFound(code.to_string()),
                other => RedirectError::Storage(other),
            })?;

        // CachePopulate, only on a probe miss and only now that the visit
        // transaction has committed.
        if probe.is_none() {
            let entry = CachedLink {
                original_url: link.original_url.clone(),
            };
            if let Err(e) = self.cache.set_link(code, &entry, self.ttls.link).await {
                warn!(code = %code, error = %e, "cache populate failed");
            }
        }

        debug!(code = %code, url = %link.original_url, "redirecting");
        Ok(Redirect {
            original_url: link.original_url,
        })
    }
}
