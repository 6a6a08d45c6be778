use crate::error::{ApiError, Result};
use crate::identity::resolve_caller;
use crate::model::{
    LinkResponse, SearchQuery, SearchResponse, ShortenRequest, UpdateLinkRequest,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use portkey_core::{LinkPatch, ShortCode};
use portkey_shortener::{ShortenParams, Shortener};

pub async fn shorten_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ShortenRequest>,
) -> Result<Json<LinkResponse>> {
    let caller = resolve_caller(&state, &headers).await?;

    let link = state
        .shortener()
        .shorten(ShortenParams {
            original_url: request.original_url,
            custom_alias: request.custom_alias,
            expires_at: request.expires_at,
            project: request.project,
            auto_renew: request.auto_renew,
            owner_user_id: caller.map(|user| user.id),
        })
        .await?;

    Ok(Json(LinkResponse::from_link(&link, state.base_url())))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let entry = state
        .shortener()
        .search(&query.original_url)
        .await?
        .ok_or_else(|| ApiError::NotFound(query.original_url.clone()))?;

    Ok(Json(SearchResponse {
        short_code: entry.short_code,
        original_url: entry.original_url,
    }))
}

pub async fn stats_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkResponse>> {
    let code = parse_code(short_code)?;
    let link = state.shortener().get(&code).await?;
    Ok(Json(LinkResponse::from_link(&link, state.base_url())))
}

pub async fn update_link_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>> {
    let code = parse_code(short_code)?;
    let caller = resolve_caller(&state, &headers).await?;

    let link = state
        .shortener()
        .update(
            &code,
            LinkPatch {
                original_url: request.original_url,
                expires_at: request.expires_at,
                project: request.project,
            },
            caller.as_ref(),
        )
        .await?;

    Ok(Json(LinkResponse::from_link(&link, state.base_url())))
}

pub async fn delete_link_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let code = parse_code(short_code)?;
    let caller = resolve_caller(&state, &headers).await?;

    state.shortener().delete(&code, caller.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_code(raw: String) -> Result<ShortCode> {
    ShortCode::new(raw).map_err(|e| ApiError::NotFound(e.to_string()))
}
