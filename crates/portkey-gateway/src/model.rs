use jiff::Timestamp;
use portkey_core::Link;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ShortenRequest {
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub project: Option<String>,
    #[serde(default)]
    pub auto_renew: bool,
}

#[derive(Deserialize)]
pub struct UpdateLinkRequest {
    pub original_url: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub project: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub original_url: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub short_code: String,
    pub original_url: String,
}

#[derive(Serialize)]
pub struct LinkResponse {
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub project: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub visits: i64,
    pub last_visited_at: Option<Timestamp>,
    pub auto_renew: bool,
}

impl LinkResponse {
    pub fn from_link(link: &Link, base_url: &str) -> Self {
        Self {
            short_code: link.short_code.as_str().to_string(),
            short_url: link.short_code.to_url(base_url),
            original_url: link.original_url.clone(),
            project: link.project.clone(),
            created_at: link.created_at,
            expires_at: link.expires_at,
            visits: link.visits,
            last_visited_at: link.last_visited_at,
            auto_renew: link.auto_renew,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
