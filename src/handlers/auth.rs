use axum::{
    Form,
    extract::State,
    response::Response,
};
use serde_json::json;
use tower_cookies::Cookies;

use super::{PageResult, optional_user_context};
use crate::{
    AppState,
    auth::{self, CurrentSession},
    models::{LoginForm, RegisterForm},
    session::{clear_session_cookie, set_session_cookie},
    view::{Flash, FlashResult, Flashes, View},
};

/// GET /
pub async fn index(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    flashes.render(Ok(View::page(
        "inicio.html",
        optional_user_context(session.as_ref()),
    )))
}

/// GET /login
pub async fn login_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    let view = match session.as_ref() {
        Some(_) => View::redirect("/clima"),
        None => View::page("login.html", json!({})),
    };
    flashes.render(Ok(view))
}

/// POST /login
///
/// On success the session token is stored in the signed cookie; on failure the login
/// form is rendered again with the submitted username.
pub async fn login_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    flashes: Flashes,
    Form(form): Form<LoginForm>,
) -> Response {
    flashes.render(login_view(&state, &cookies, form).await)
}

async fn login_view(state: &AppState, cookies: &Cookies, form: LoginForm) -> PageResult {
    let session = auth::login(state.repo.as_ref(), state.sessions.as_ref(), &form)
        .await
        .or_form(
            "/login",
            "login.html",
            json!({ "username": form.username }),
        )?;
    set_session_cookie(cookies, &state.cookie_key, &session.id);
    Ok(View::redirect_with(
        "/clima",
        Flash::success("¡Inicio de sesión exitoso!"),
    ))
}

/// GET /registro
pub async fn register_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    let view = match session.as_ref() {
        Some(_) => View::redirect("/clima"),
        None => View::page("registro.html", json!({})),
    };
    flashes.render(Ok(view))
}

/// POST /registro
pub async fn register_submit(
    State(state): State<AppState>,
    flashes: Flashes,
    Form(form): Form<RegisterForm>,
) -> Response {
    flashes.render(register_view(&state, form).await)
}

async fn register_view(state: &AppState, form: RegisterForm) -> PageResult {
    let context = json!({ "username": form.username, "email": form.email });
    auth::register(state.repo.as_ref(), form)
        .await
        .or_form("/registro", "registro.html", context)?;
    Ok(View::redirect_with(
        "/login",
        Flash::success("¡Registro exitoso! Ahora puedes iniciar sesión."),
    ))
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    cookies: Cookies,
    flashes: Flashes,
) -> Response {
    auth::logout(state.sessions.as_ref(), session.as_ref());
    clear_session_cookie(&cookies);
    flashes.render(Ok(View::redirect_with(
        "/",
        Flash::info("Has cerrado sesión correctamente"),
    )))
}
