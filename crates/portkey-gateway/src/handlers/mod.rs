mod analytics;
mod health;
mod links;
mod redirect;

pub use analytics::{agents_handler, daily_handler, hourly_handler, project_stats_handler};
pub use health::health_handler;
pub use links::{
    delete_link_handler, search_handler, shorten_handler, stats_handler, update_link_handler,
};
pub use redirect::redirect_handler;
