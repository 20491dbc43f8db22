use axum::{
    Json,
    extract::State,
    response::Response,
};
use serde_json::json;

use super::{PageResult, page_context};
use crate::{
    AppState,
    auth::{CurrentSession, require_session},
    error::AppError,
    models::WeatherReport,
    session::Session,
    view::{FlashResult, Flashes, View},
    weather,
};

/// GET /clima
///
/// Weather dashboard page. The report itself is fetched by the page from `/api/weather`.
pub async fn clima_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    flashes.render(clima_view(session.as_ref()))
}

fn clima_view(session: Option<&Session>) -> PageResult {
    let user = require_session(session).or_redirect("/login")?;
    Ok(View::page("clima.html", page_context(user, json!({}))))
}

/// get_weather
///
/// [Authenticated Route] Current conditions in Aguascalientes. Never fails once the session
/// is valid: when the provider cannot be used the fixed fallback report is returned
/// (`source = "fallback"`).
#[utoipa::path(
    get,
    path = "/api/weather",
    responses(
        (status = 200, description = "Current weather", body = WeatherReport),
        (status = 401, description = "No session")
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<WeatherReport>, AppError> {
    let report = weather::get_current_weather(state.weather.as_ref(), session.as_ref()).await?;
    Ok(Json(report))
}

