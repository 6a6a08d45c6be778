use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use portkey_analytics::{AgentCount, Analytics, HourCount, ProjectStats};
use portkey_core::{DayCount, ShortCode};

pub async fn daily_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DayCount>>> {
    let code = parse_code(short_code)?;
    Ok(Json(state.analytics().daily_counts(&code).await?))
}

pub async fn hourly_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<HourCount>>> {
    let code = parse_code(short_code)?;
    Ok(Json(state.analytics().hourly_counts(&code).await?))
}

pub async fn agents_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AgentCount>>> {
    let code = parse_code(short_code)?;
    Ok(Json(state.analytics().user_agent_counts(&code).await?))
}

pub async fn project_stats_handler(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProjectStats>> {
    Ok(Json(state.analytics().project_stats(&name).await?))
}

fn parse_code(raw: String) -> Result<ShortCode> {
    ShortCode::new(raw).map_err(|e| ApiError::NotFound(e.to_string()))
}
