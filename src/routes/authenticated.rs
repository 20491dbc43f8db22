use crate::{AppState, handlers::weather};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any logged-in user. Without a session the page redirects to /login and the
/// JSON endpoint answers 401.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /clima
        // Weather dashboard page.
        .route("/clima", get(weather::clima_page))
        // GET /api/weather
        // Current conditions, or the fallback report when the provider is unusable.
        .route("/api/weather", get(weather::get_weather))
}
