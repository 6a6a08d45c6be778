use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One recorded redirect. Insert-only; removed only when the owning link
/// is deleted (cascade).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub link_id: i64,
    pub visited_at: Timestamp,
    pub day_bucket: String,
    pub hour_bucket: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Input for recording a visit. The store attaches the `link_id` and
/// performs the counter update in the same transaction.
#[derive(Debug, Clone)]
pub struct NewVisit {
    pub visited_at: Timestamp,
    pub day_bucket: String,
    pub hour_bucket: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewVisit {
    /// Builds a visit stamped at `now`, deriving the UTC calendar buckets.
    pub fn at(now: Timestamp, client_ip: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            visited_at: now,
            day_bucket: day_bucket(now),
            hour_bucket: hour_bucket(now),
            client_ip,
            user_agent,
        }
    }
}

/// UTC calendar-day bucket, `YYYY-MM-DD`. Sorts chronologically as a string.
pub fn day_bucket(ts: Timestamp) -> String {
    ts.to_zoned(TimeZone::UTC).strftime("%Y-%m-%d").to_string()
}

/// UTC calendar-hour bucket, `YYYY-MM-DD-HH`.
pub fn hour_bucket(ts: Timestamp) -> String {
    ts.to_zoned(TimeZone::UTC)
        .strftime("%Y-%m-%d-%H")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_use_utc_calendar() {
        // 2024-06-01T23:30:00Z
        let ts = Timestamp::from_second(1717284600).unwrap();
        assert_eq!(day_bucket(ts), "2024-06-01");
        assert_eq!(hour_bucket(ts), "2024-06-01-23");
    }

    #[test]
    fn buckets_sort_chronologically() {
        let earlier = Timestamp::from_second(1717284600).unwrap();
        let later = Timestamp::from_second(1717284600 + 3600).unwrap();
        assert!(day_bucket(earlier) <= day_bucket(later));
        assert!(hour_bucket(earlier) < hour_bucket(later));
    }

    #[test]
    fn new_visit_derives_buckets() {
        let ts = Timestamp::from_second(1717284600).unwrap();
        let visit = NewVisit::at(ts, Some("203.0.113.9".to_string()), None);
        assert_eq!(visit.day_bucket, "2024-06-01");
        assert_eq!(visit.hour_bucket, "2024-06-01-23");
        assert_eq!(visit.visited_at, ts);
    }
}
