use axum::{Router, extract::FromRef, http::HeaderName};
use tower_cookies::{CookieManagerLayer, Key};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod view;
pub mod weather;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use session::{InMemorySessionStore, SessionState};
pub use weather::{MockWeatherProvider, OpenWeatherClient, WeatherState};

/// ApiDoc
///
/// OpenAPI document for the JSON endpoints, served at `/api-docs/openapi.json` and
/// browsable under `/swagger-ui`. The HTML-style pages are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::weather::get_weather,
        handlers::api::get_emergency_numbers,
        handlers::api::get_tips,
        handlers::api::get_quote_of_the_day,
    ),
    components(
        schemas(
            models::WeatherReport, models::EmergencyNumber, models::Tip, models::Quote,
        )
    ),
    tags(
        (name = "climascalientes", description = "Climascalientes weather and civic information API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container for every service the handlers need. Cheap to clone: all
/// services sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres or in-memory).
    pub repo: RepositoryState,
    /// Server-side sessions keyed by the cookie token.
    pub sessions: SessionState,
    /// Current-conditions provider.
    pub weather: WeatherState,
    /// Signs the session and flash cookies.
    pub cookie_key: Key,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for WeatherState {
    fn from_ref(app_state: &AppState) -> WeatherState {
        app_state.weather.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(app_state: &AppState) -> Key {
        app_state.cookie_key.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the route groups, the cookie manager and the observability layers, then
/// binds the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .with_state(state)
        // Session and flash cookies; every page handler depends on it.
        .layer(CookieManagerLayer::new());

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its
/// `x-request-id`, method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
