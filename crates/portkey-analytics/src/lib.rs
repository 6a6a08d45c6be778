//! Visit aggregations.
//!
//! Everything here is a pure aggregation over stored visit records:
//! time-bucketed counts per short code, user-agent breakdowns, and
//! per-project rollups. Daily counts are the hot query and ride the
//! `analytics:daily:` cache namespace; the rest compute on demand.

pub mod analytics;
pub mod error;
pub mod service;

pub use analytics::{AgentCount, Analytics, HourCount, ProjectStats};
pub use error::AnalyticsError;
pub use service::AnalyticsService;
