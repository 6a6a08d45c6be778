use crate::error::AnalyticsError;
use async_trait::async_trait;
use portkey_core::{DayCount, ShortCode};
use serde::Serialize;

type Result<T> = std::result::Result<T, AnalyticsError>;

/// One hour's visit count, `hour` being a `YYYY-MM-DD-HH` bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCount {
    pub hour: String,
    pub count: i64,
}

/// Visit count per user agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCount {
    pub user_agent: String,
    pub count: i64,
}

/// Rollup across every link in a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStats {
    pub total_visits: i64,
    pub unique_ips: i64,
}

#[async_trait]
pub trait Analytics: Send + Sync + 'static {
    /// Daily visit counts, ascending by day. Cache-accelerated.
    async fn daily_counts(&self, code: &ShortCode) -> Result<Vec<DayCount>>;

    /// Hourly visit counts, ascending by hour.
    async fn hourly_counts(&self, code: &ShortCode) -> Result<Vec<HourCount>>;

    /// Visit counts per user agent, descending by count; agents with equal
    /// counts keep first-seen order.
    async fn user_agent_counts(&self, code: &ShortCode) -> Result<Vec<AgentCount>>;

    /// Total visits and distinct client IPs across a project's links.
    async fn project_stats(&self, project: &str) -> Result<ProjectStats>;
}
