use crate::error::RedirectError;
use async_trait::async_trait;
use portkey_core::ShortCode;

type Result<T> = std::result::Result<T, RedirectError>;

/// Request metadata recorded with each visit.
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A resolved redirect. The caller must emit it with temporary-redirect
/// semantics (HTTP 307: method and body preserved).
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub original_url: String,
}

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code, records the visit, and returns the redirect
    /// target; `NotFound` for unknown codes, `Gone` for lapsed ones.
    async fn redirect(&self, code: &ShortCode, visit: VisitContext) -> Result<Redirect>;
}
