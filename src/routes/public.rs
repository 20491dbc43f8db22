use crate::{
    AppState,
    handlers::{api, auth},
};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages and JSON endpoints any client may reach. The JSON listings only ever expose
/// active rows.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(auth::index))
        // GET/POST /login, /registro
        // A visitor who already has a session is sent to /clima.
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route(
            "/registro",
            get(auth::register_page).post(auth::register_submit),
        )
        .route("/logout", get(auth::logout))
        // --- Public JSON ---
        .route("/api/emergencia", get(api::get_emergency_numbers))
        .route("/api/consejos", get(api::get_tips))
        // Returns {} when no quote is active.
        .route("/api/frase_dia", get(api::get_quote_of_the_day))
}
