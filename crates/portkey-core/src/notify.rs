use crate::error::NotifyError;
use crate::link::Link;
use async_trait::async_trait;
use tracing::info;

/// Fire-and-forget notification seam.
///
/// The sweeper calls this for links expiring soon; it does not await
/// delivery guarantees, and failures are logged rather than retried.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_expiry_warning(&self, email: &str, link: &Link) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Stands in when no mail transport is wired up.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_expiry_warning(&self, email: &str, link: &Link) -> Result<(), NotifyError> {
        info!(
            email = %email,
            code = %link.short_code,
            expires_at = ?link.expires_at,
            "expiry warning"
        );
        Ok(())
    }
}
