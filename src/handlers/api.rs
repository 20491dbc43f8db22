use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    error::AppError,
    models::{EmergencyNumber, Quote, Tip},
    services::content::{emergency, quotes, tips},
};

/// get_emergency_numbers
///
/// [Public Route] Active emergency numbers ordered by category, then name.
#[utoipa::path(
    get,
    path = "/api/emergencia",
    responses(
        (status = 200, description = "Active emergency numbers", body = [EmergencyNumber]),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn get_emergency_numbers(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmergencyNumber>>, AppError> {
    Ok(Json(emergency::public_list(state.repo.as_ref()).await?))
}

/// get_tips
///
/// [Public Route] Active weather tips, newest first.
#[utoipa::path(
    get,
    path = "/api/consejos",
    responses(
        (status = 200, description = "Active tips", body = [Tip]),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn get_tips(State(state): State<AppState>) -> Result<Json<Vec<Tip>>, AppError> {
    Ok(Json(tips::public_list(state.repo.as_ref()).await?))
}

/// get_quote_of_the_day
///
/// [Public Route] The active quote, or an empty object when none is active.
#[utoipa::path(
    get,
    path = "/api/frase_dia",
    responses(
        (status = 200, description = "Active quote, or {}", body = Quote),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn get_quote_of_the_day(State(state): State<AppState>) -> Result<Response, AppError> {
    let response = match quotes::public_list(state.repo.as_ref()).await? {
        Some(quote) => Json(quote).into_response(),
        None => Json(json!({})).into_response(),
    };
    Ok(response)
}
