use crate::analytics::{AgentCount, Analytics, HourCount, ProjectStats};
use crate::error::AnalyticsError;
use async_trait::async_trait;
use portkey_core::{
    CacheTtls, DayCount, Link, LinkRepository, RedirectCache, ShortCode, VisitRecord,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, AnalyticsError>;

const UNKNOWN_AGENT: &str = "unknown";

/// A concrete implementation of the [`Analytics`] trait.
#[derive(Debug, Clone)]
pub struct AnalyticsService<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    ttls: CacheTtls,
}

impl<R: LinkRepository, C: RedirectCache> AnalyticsService<R, C> {
    /// Creates a service with the default cache TTLs.
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

    async fn link_for(&self, code: &ShortCode) -> Result<Link> {
        self.repository
            .get_by_short_code(code)
            .await?
            .ok_or_else(|| AnalyticsError::NotFound(code.to_string()))
    }
}

fn bucket_counts(visits: &[VisitRecord], bucket: impl Fn(&VisitRecord) -> &str) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for visit in visits {
        *counts.entry(bucket(visit).to_string()).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl<R: LinkRepository, C: RedirectCache> Analytics for AnalyticsService<R, C> {
    async fn daily_counts(&self, code: &ShortCode) -> Result<Vec<DayCount>> {
        match self.cache.get_daily(code).await {
            Ok(Some(counts)) => {
                debug!(code = %code, "daily counts served from cache");
                return Ok(counts);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(code = %code, error = %e, "daily-counts cache probe failed, falling through");
            }
        }

        let link = self.link_for(code).await?;
        let visits = self.repository.get_visits(link.id).await?;

        let counts: Vec<DayCount> = bucket_counts(&visits, |visit| &visit.day_bucket)
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect();

        if let Err(e) = self.cache.set_daily(code, &counts, self.ttls.daily).await {
            warn!(code = %code, error = %e, "daily-counts cache populate failed");
        }
        Ok(counts)
    }

    async fn hourly_counts(&self, code: &ShortCode) -> Result<Vec<HourCount>> {
        let link = self.link_for(code).await?;
        let visits = self.repository.get_visits(link.id).await?;

        Ok(bucket_counts(&visits, |visit| &visit.hour_bucket)
            .into_iter()
            .map(|(hour, count)| HourCount { hour, count })
            .collect())
    }

    async fn user_agent_counts(&self, code: &ShortCode) -> Result<Vec<AgentCount>> {
        let link = self.link_for(code).await?;
        let visits = self.repository.get_visits(link.id).await?;

        // First-seen order, so a stable sort keeps ties in insertion order.
        let mut counts: Vec<AgentCount> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for visit in &visits {
            let agent = visit.user_agent.as_deref().unwrap_or(UNKNOWN_AGENT);
            match index.get(agent) {
                Some(&at) => counts[at].count += 1,
                None => {
                    index.insert(agent.to_string(), counts.len());
                    counts.push(AgentCount {
                        user_agent: agent.to_string(),
                        count: 1,
                    });
                }
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }

    async fn project_stats(&self, project: &str) -> Result<ProjectStats> {
        let links = self.repository.get_by_project(project).await?;

        let mut total_visits = 0i64;
        let mut ips: HashSet<String> = HashSet::new();
        for link in &links {
            let visits = self.repository.get_visits(link.id).await?;
            total_visits += visits.len() as i64;
            for visit in visits {
                if let Some(ip) = visit.client_ip {
                    ips.insert(ip);
                }
            }
        }

        Ok(ProjectStats {
            total_visits,
            unique_ips: ips.len() as i64,
        })
    }
}
