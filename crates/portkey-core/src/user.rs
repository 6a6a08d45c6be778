use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role attached to a caller identity. Admins may mutate any link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// A resolved caller identity, owned by the external auth collaborator.
///
/// The core only consumes `{id, email, role}`; registration, credentials
/// and token issuance live outside this workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Lookup seam for caller identities.
///
/// Backed by the auth collaborator's user table; an absent id resolves to
/// `None` and the caller is treated as anonymous.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError>;
}
