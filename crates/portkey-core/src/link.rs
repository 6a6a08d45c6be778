use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A stored link: the full state behind one short code.
///
/// `short_code` is unique among live links and immutable once assigned.
/// `custom_alias`, when present, equals `short_code`. The `visits` counter
/// and `last_visited_at` are owned by [`LinkRepository::record_visit`]
/// and must never be written through [`LinkRepository::update`].
///
/// [`LinkRepository::record_visit`]: crate::repository::LinkRepository::record_visit
/// [`LinkRepository::update`]: crate::repository::LinkRepository::update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub short_code: ShortCode,
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub project: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub visits: i64,
    pub last_visited_at: Option<Timestamp>,
    pub auto_renew: bool,
    pub owner_user_id: Option<i64>,
}

impl Link {
    /// Whether the link has lapsed as of `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Input for creating a link. The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub short_code: ShortCode,
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub project: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub auto_renew: bool,
    pub owner_user_id: Option<i64>,
}

/// A partial update to a link's caller-mutable fields.
///
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub original_url: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub project: Option<String>,
}

/// Why a link was removed from the live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveReason {
    Expired,
    Unused,
    User,
    Admin,
}

impl ArchiveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveReason::Expired => "expired",
            ArchiveReason::Unused => "unused",
            ArchiveReason::User => "user",
            ArchiveReason::Admin => "admin",
        }
    }
}

impl Display for ArchiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tombstone for a removed link. Written whenever a link leaves the live
/// table through any path, never mutated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub link_id: i64,
    pub short_code: String,
    pub original_url: String,
    pub deleted_at: Timestamp,
    pub reason: ArchiveReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn link_expiring_at(expires_at: Option<Timestamp>) -> Link {
        Link {
            id: 1,
            short_code: ShortCode::new_unchecked("abc123"),
            original_url: "https://example.com".to_string(),
            custom_alias: None,
            project: None,
            created_at: Timestamp::now(),
            expires_at,
            visits: 0,
            last_visited_at: None,
            auto_renew: false,
            owner_user_id: None,
        }
    }

    #[test]
    fn never_expires_without_deadline() {
        let link = link_expiring_at(None);
        assert!(!link.is_expired(Timestamp::now()));
    }

    #[test]
    fn expired_one_second_ago() {
        let now = Timestamp::now();
        let link = link_expiring_at(Some(now - SignedDuration::from_secs(1)));
        assert!(link.is_expired(now));
    }

    #[test]
    fn alive_one_second_from_now() {
        let now = Timestamp::now();
        let link = link_expiring_at(Some(now + SignedDuration::from_secs(1)));
        assert!(!link.is_expired(now));
    }

    #[test]
    fn archive_reason_strings() {
        assert_eq!(ArchiveReason::Expired.as_str(), "expired");
        assert_eq!(ArchiveReason::Unused.as_str(), "unused");
        assert_eq!(ArchiveReason::User.as_str(), "user");
        assert_eq!(ArchiveReason::Admin.as_str(), "admin");
    }
}
