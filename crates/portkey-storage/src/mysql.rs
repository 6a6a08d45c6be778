use async_trait::async_trait;
use jiff::Timestamp;
use portkey_core::repository::Result;
use portkey_core::{
    ArchiveReason, ArchiveRecord, Link, LinkRepository, NewLink, NewVisit, ShortCode,
    StorageError, VisitRecord,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// MySQL implementation of the repository contract.
///
/// Timestamps are stored as unix seconds. Short-code uniqueness rides on
/// the `links.short_code` unique index: a duplicate insert surfaces as
/// `Conflict` rather than being pre-checked, so concurrent shorten
/// requests for the same alias serialize at the database.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Operation(e.to_string()))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds
        .map(|value| {
            Timestamp::from_second(value).map_err(|e| {
                StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
            })
        })
        .transpose()
}

fn parse_required_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn row_to_link(row: &MySqlRow) -> Result<Link> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let created_at_raw: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at_raw: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let last_visited_raw: Option<i64> = row.try_get("last_visited_at").map_err(map_sqlx_error)?;

    Ok(Link {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        short_code: ShortCode::new_unchecked(short_code),
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        custom_alias: row.try_get("custom_alias").map_err(map_sqlx_error)?,
        project: row.try_get("project").map_err(map_sqlx_error)?,
        created_at: parse_required_timestamp("created_at", created_at_raw)?,
        expires_at: parse_timestamp("expires_at", expires_at_raw)?,
        visits: row.try_get("visits").map_err(map_sqlx_error)?,
        last_visited_at: parse_timestamp("last_visited_at", last_visited_raw)?,
        auto_renew: row.try_get("auto_renew").map_err(map_sqlx_error)?,
        owner_user_id: row.try_get("owner_user_id").map_err(map_sqlx_error)?,
    })
}

fn row_to_visit(row: &MySqlRow) -> Result<VisitRecord> {
    let visited_at_raw: i64 = row.try_get("visited_at").map_err(map_sqlx_error)?;

    Ok(VisitRecord {
        link_id: row.try_get("link_id").map_err(map_sqlx_error)?,
        visited_at: parse_required_timestamp("visited_at", visited_at_raw)?,
        day_bucket: row.try_get("day_bucket").map_err(map_sqlx_error)?,
        hour_bucket: row.try_get("hour_bucket").map_err(map_sqlx_error)?,
        client_ip: row.try_get("client_ip").map_err(map_sqlx_error)?,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
    })
}

fn reason_from_str(raw: &str) -> Result<ArchiveReason> {
    match raw {
        "expired" => Ok(ArchiveReason::Expired),
        "unused" => Ok(ArchiveReason::Unused),
        "user" => Ok(ArchiveReason::User),
        "admin" => Ok(ArchiveReason::Admin),
        other => Err(StorageError::InvalidData(format!(
            "unknown archive reason '{other}'"
        ))),
    }
}

const SELECT_LINK: &str = r#"
    SELECT id, short_code, original_url, custom_alias, project, created_at,
           expires_at, visits, last_visited_at, auto_renew, owner_user_id
    FROM links
"#;

#[async_trait]
impl LinkRepository for MySqlRepository {
    async fn create(&self, link: NewLink) -> Result<Link> {
        let created_at = Timestamp::now();

        let result = sqlx::query(
            r#"
            INSERT INTO links
                (short_code, original_url, custom_alias, project, created_at,
                 expires_at, visits, last_visited_at, auto_renew, owner_user_id)
            VALUES (?, ?, ?, ?, ?, ?, 0, NULL, ?, ?)
            "#,
        )
        .bind(link.short_code.as_str())
        .bind(&link.original_url)
        .bind(&link.custom_alias)
        .bind(&link.project)
        .bind(created_at.as_second())
        .bind(link.expires_at.map(|ts| ts.as_second()))
        .bind(link.auto_renew)
        .bind(link.owner_user_id)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(link.short_code.to_string()));
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        Ok(Link {
            id: result.last_insert_id() as i64,
            short_code: link.short_code,
            original_url: link.original_url,
            custom_alias: link.custom_alias,
            project: link.project,
            created_at,
            expires_at: link.expires_at,
            visits: 0,
            last_visited_at: None,
            auto_renew: link.auto_renew,
            owner_user_id: link.owner_user_id,
        })
    }

    async fn get_by_short_code(&self, code: &ShortCode) -> Result<Option<Link>> {
        let sql = format!("{SELECT_LINK} WHERE short_code = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_link).transpose()
    }

    async fn get_by_original_url(&self, url: &str) -> Result<Option<Link>> {
        let sql = format!("{SELECT_LINK} WHERE original_url = ? ORDER BY id LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_link).transpose()
    }

    async fn get_by_owner(&self, owner_user_id: i64) -> Result<Vec<Link>> {
        let sql = format!("{SELECT_LINK} WHERE owner_user_id = ? ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(owner_user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_link).collect()
    }

    async fn get_by_project(&self, project: &str) -> Result<Vec<Link>> {
        let sql = format!("{SELECT_LINK} WHERE project = ? ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(project)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_link).collect()
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn get_expired(&self, now: Timestamp) -> Result<Vec<Link>> {
        let sql = format!(
            "{SELECT_LINK} WHERE expires_at IS NOT NULL AND expires_at <= ? ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(now.as_second())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_link).collect()
    }

    async fn get_expiring(&self, now: Timestamp, until: Timestamp) -> Result<Vec<Link>> {
        let sql = format!(
            "{SELECT_LINK} WHERE expires_at IS NOT NULL AND expires_at > ? AND expires_at <= ? ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(now.as_second())
            .bind(until.as_second())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_link).collect()
    }

    async fn get_stale(&self, cutoff: Timestamp) -> Result<Vec<Link>> {
        let sql = format!(
            "{SELECT_LINK} WHERE (last_visited_at IS NOT NULL AND last_visited_at < ?) \
             OR (last_visited_at IS NULL AND created_at < ?) ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff.as_second())
            .bind(cutoff.as_second())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_link).collect()
    }

    async fn update(&self, link: &Link) -> Result<()> {
        // Only the policy fields; `visits`/`last_visited_at` belong to
        // record_visit and must not race with it here.
        sqlx::query(
            r#"
            UPDATE links
            SET original_url = ?, project = ?, expires_at = ?, auto_renew = ?
            WHERE id = ?
            "#,
        )
        .bind(&link.original_url)
        .bind(&link.project)
        .bind(link.expires_at.map(|ts| ts.as_second()))
        .bind(link.auto_renew)
        .bind(link.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn record_visit(&self, link_id: i64, visit: NewVisit) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE links
            SET visits = visits + 1, last_visited_at = ?
            WHERE id = ?
            "#,
        )
        .bind(visit.visited_at.as_second())
        .bind(link_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("link id {link_id}")));
        }

        sqlx::query(
            r#"
            INSERT INTO link_visits
                (link_id, visited_at, day_bucket, hour_bucket, client_ip, user_agent)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link_id)
        .bind(visit.visited_at.as_second())
        .bind(&visit.day_bucket)
        .bind(&visit.hour_bucket)
        .bind(&visit.client_ip)
        .bind(&visit.user_agent)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn archive_and_delete(&self, link: &Link, reason: ArchiveReason) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Sweeper removals re-check the condition field with a null-safe
        // compare, so a concurrent renew or visit voids the candidate.
        let delete = match reason {
            ArchiveReason::Expired => sqlx::query(
                "DELETE FROM links WHERE id = ? AND expires_at <=> ?",
            )
            .bind(link.id)
            .bind(link.expires_at.map(|ts| ts.as_second())),
            ArchiveReason::Unused => sqlx::query(
                "DELETE FROM links WHERE id = ? AND last_visited_at <=> ?",
            )
            .bind(link.id)
            .bind(link.last_visited_at.map(|ts| ts.as_second())),
            ArchiveReason::User | ArchiveReason::Admin => {
                sqlx::query("DELETE FROM links WHERE id = ?").bind(link.id)
            }
        };

        let deleted = delete.execute(&mut *tx).await.map_err(map_sqlx_error)?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO link_archives (link_id, short_code, original_url, deleted_at, reason)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.id)
        .bind(link.short_code.as_str())
        .bind(&link.original_url)
        .bind(Timestamp::now().as_second())
        .bind(reason.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }

    async fn get_visits(&self, link_id: i64) -> Result<Vec<VisitRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT link_id, visited_at, day_bucket, hour_bucket, client_ip, user_agent
            FROM link_visits
            WHERE link_id = ?
            ORDER BY id
            "#,
        )
        .bind(link_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_visit).collect()
    }

    async fn archives_for(&self, code: &ShortCode) -> Result<Vec<ArchiveRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT link_id, short_code, original_url, deleted_at, reason
            FROM link_archives
            WHERE short_code = ?
            ORDER BY id
            "#,
        )
        .bind(code.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let deleted_at_raw: i64 = row.try_get("deleted_at").map_err(map_sqlx_error)?;
                let reason_raw: String = row.try_get("reason").map_err(map_sqlx_error)?;

                Ok(ArchiveRecord {
                    link_id: row.try_get("link_id").map_err(map_sqlx_error)?,
                    short_code: row.try_get("short_code").map_err(map_sqlx_error)?,
                    original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
                    deleted_at: parse_required_timestamp("deleted_at", deleted_at_raw)?,
                    reason: reason_from_str(&reason_raw)?,
                })
            })
            .collect()
    }
}
