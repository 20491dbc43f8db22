use axum::{
    Form,
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;

use super::{PageResult, page_context};
use crate::{
    AppState,
    auth::{CurrentSession, require_admin},
    models::{CreateUserForm, EditUserForm, UserSearch},
    services::users,
    session::Session,
    view::{Flash, FlashResult, Flashes, View},
};

const DASHBOARD: &str = "/dashboard";

/// GET /dashboard?busqueda=
///
/// Admin user listing. A numeric search looks up a single id.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Query(search): Query<UserSearch>,
) -> Response {
    flashes.render(dashboard_view(&state, session.as_ref(), search).await)
}

async fn dashboard_view(state: &AppState, session: Option<&Session>, search: UserSearch) -> PageResult {
    let user = require_admin(session).or_redirect("/")?;
    let busqueda = search.busqueda.unwrap_or_default();
    let usuarios = users::list(state.repo.as_ref(), session, Some(busqueda.as_str()))
        .await
        .or_redirect("/")?;
    Ok(View::page(
        "admin.html",
        page_context(user, json!({ "usuarios": usuarios, "busqueda": busqueda })),
    ))
}

/// GET /crear_usuario
pub async fn create_user_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    let result = require_admin(session.as_ref())
        .or_redirect(DASHBOARD)
        .map(|user| View::page("crear_usuario.html", page_context(user, json!({}))));
    flashes.render(result)
}

/// POST /crear_usuario
pub async fn create_user_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Form(form): Form<CreateUserForm>,
) -> Response {
    flashes.render(create_user_view(&state, session.as_ref(), form).await)
}

async fn create_user_view(state: &AppState, session: Option<&Session>, form: CreateUserForm) -> PageResult {
    let user = require_admin(session).or_redirect(DASHBOARD)?;
    let context = page_context(
        user,
        json!({ "form": { "username": form.username, "email": form.email, "rol": form.rol } }),
    );
    let input = form
        .validate()
        .or_form(DASHBOARD, "crear_usuario.html", context.clone())?;
    users::create(state.repo.as_ref(), session, input)
        .await
        .or_form(DASHBOARD, "crear_usuario.html", context)?;
    Ok(View::redirect_with(
        DASHBOARD,
        Flash::success("Usuario creado correctamente"),
    ))
}

/// GET /editar_usuario/{id}
pub async fn edit_user_page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    flashes.render(edit_user_page_view(&state, session.as_ref(), id).await)
}

async fn edit_user_page_view(state: &AppState, session: Option<&Session>, id: i64) -> PageResult {
    let user = require_admin(session).or_redirect(DASHBOARD)?;
    let usuario = users::get(state.repo.as_ref(), session, id)
        .await
        .or_redirect(DASHBOARD)?;
    Ok(View::page(
        "editar_usuario.html",
        page_context(user, json!({ "usuario": usuario })),
    ))
}

/// POST /editar_usuario/{id}
pub async fn edit_user_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> Response {
    flashes.render(edit_user_view(&state, session.as_ref(), id, form).await)
}

async fn edit_user_view(
    state: &AppState,
    session: Option<&Session>,
    id: i64,
    form: EditUserForm,
) -> PageResult {
    let user = require_admin(session).or_redirect(DASHBOARD)?;
    let context = page_context(
        user,
        json!({
            "usuario": { "id": id, "username": form.username, "email": form.email, "rol": form.rol }
        }),
    );
    let input = form
        .validate()
        .or_form(DASHBOARD, "editar_usuario.html", context.clone())?;
    users::update(state.repo.as_ref(), session, id, input)
        .await
        .or_form(DASHBOARD, "editar_usuario.html", context)?;
    Ok(View::redirect_with(
        DASHBOARD,
        Flash::success("Usuario actualizado correctamente"),
    ))
}

/// GET /eliminar_usuario/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    let result = users::delete(
        state.repo.as_ref(),
        state.sessions.as_ref(),
        session.as_ref(),
        id,
    )
    .await
    .or_redirect(DASHBOARD)
    .map(|()| View::redirect_with(DASHBOARD, Flash::success("Usuario eliminado correctamente")));
    flashes.render(result)
}
