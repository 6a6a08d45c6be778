use async_trait::async_trait;
use dashmap::DashMap;
use portkey_core::{Role, StorageError, User, UserDirectory};
use sqlx::{MySqlPool, Row};

/// In-memory user directory for tests and single-node development.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<i64, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }
}

/// User directory backed by the auth collaborator's `users` table.
#[derive(Debug, Clone)]
pub struct MySqlUserDirectory {
    pool: MySqlPool,
}

impl MySqlUserDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, role
            FROM users
            WHERE id = ?
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_raw: String = row
            .try_get("role")
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let role = match role_raw.as_str() {
            "admin" => Role::Admin,
            _ => Role::User,
        };

        Ok(Some(User {
            id: row
                .try_get("id")
                .map_err(|e| StorageError::InvalidData(e.to_string()))?,
            email: row
                .try_get("email")
                .map_err(|e| StorageError::InvalidData(e.to_string()))?,
            role,
        }))
    }
}
