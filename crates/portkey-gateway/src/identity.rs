use crate::error::Result;
use crate::state::AppState;
use axum::http::HeaderMap;
use portkey_core::{User, UserDirectory};

/// Header carrying the caller's resolved user id.
///
/// Token validation happens upstream in the auth collaborator; by the
/// time a request reaches this service the id is trusted. Absent or
/// unparseable values mean an anonymous caller.
pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<Option<User>> {
    let Some(id) = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
    else {
        return Ok(None);
    };

    Ok(state.directory().get_user(id).await?)
}
