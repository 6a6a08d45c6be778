//! HTTP surface for the Portkey URL shortener.
//!
//! Thin axum layer over the service crates: it parses requests, resolves
//! the optional caller identity, and maps the service error taxonomy onto
//! status codes (307/404/410/403/409). All policy lives below this crate.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod model;
pub mod state;

pub use app::App;
pub use config::Cli;
pub use error::ApiError;
pub use state::AppState;
