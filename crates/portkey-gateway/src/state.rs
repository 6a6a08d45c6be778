use portkey_analytics::Analytics;
use portkey_core::UserDirectory;
use portkey_redirector::Redirector;
use portkey_shortener::Shortener;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    redirector: Arc<dyn Redirector>,
    analytics: Arc<dyn Analytics>,
    directory: Arc<dyn UserDirectory>,
    base_url: String,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        redirector: Arc<dyn Redirector>,
        analytics: Arc<dyn Analytics>,
        directory: Arc<dyn UserDirectory>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            redirector,
            analytics,
            directory,
            base_url: public_base_url.into(),
        }
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn redirector(&self) -> &dyn Redirector {
        self.redirector.as_ref()
    }

    pub fn analytics(&self) -> &dyn Analytics {
        self.analytics.as_ref()
    }

    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
