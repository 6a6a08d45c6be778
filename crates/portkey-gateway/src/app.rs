use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    agents_handler, daily_handler, delete_link_handler, health_handler, hourly_handler,
    project_stats_handler, redirect_handler, search_handler, shorten_handler, stats_handler,
    update_link_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/links",
                Router::new()
                    .route("/shorten", post(shorten_handler))
                    .route("/search", get(search_handler))
                    .route("/{short_code}/stats", get(stats_handler))
                    .route(
                        "/{short_code}",
                        axum::routing::put(update_link_handler).delete(delete_link_handler),
                    ),
            )
            .nest(
                "/analytics",
                Router::new()
                    .route("/daily/{short_code}", get(daily_handler))
                    .route("/hourly/{short_code}", get(hourly_handler))
                    .route("/agents/{short_code}", get(agents_handler)),
            )
            .route("/project/{name}/stats", get(project_stats_handler))
            .route("/{short_code}", get(redirect_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
