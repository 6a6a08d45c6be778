use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use portkey_core::ShortCode;
use portkey_redirector::{Redirector, VisitContext};

/// `GET /{short_code}` — the redirect path.
///
/// 307 preserves the method and body; 404 and 410 stay distinct so
/// clients can tell a dead code from a lapsed one.
pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    // A malformed code can't name a live link; to the client that is 404.
    let code =
        ShortCode::new(short_code).map_err(|e| ApiError::NotFound(e.to_string()))?;

    let visit = VisitContext {
        client_ip: client_ip(&headers),
        user_agent: header_value(&headers, header::USER_AGENT.as_str()),
    };

    let redirect = state.redirector().redirect(&code, visit).await?;

    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(header::LOCATION, redirect.original_url)
        .body(axum::body::Body::empty())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Client address as reported by the reverse proxy.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    header_value(headers, "x-real-ip")
}
