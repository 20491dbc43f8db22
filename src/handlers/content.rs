//! Admin screens for emergency numbers, weather tips and quotes of the day.

use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use serde_json::json;

use super::{PageResult, page_context};
use crate::{
    AppState,
    auth::{CurrentSession, require_admin},
    models::{EmergencyNumberForm, QuoteForm, TipForm},
    services::content::{emergency, quotes, tips},
    session::Session,
    view::{Flash, FlashResult, Flashes, View},
};

const EMERGENCIA: &str = "/admin/emergencia";
const CONSEJOS: &str = "/admin/consejos";
const FRASES: &str = "/admin/frases";

// --- Emergency numbers ---

pub async fn emergency_list(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
) -> Response {
    flashes.render(emergency_list_view(&state, session.as_ref()).await)
}

async fn emergency_list_view(state: &AppState, session: Option<&Session>) -> PageResult {
    let user = require_admin(session).or_redirect("/")?;
    let numeros = emergency::list(state.repo.as_ref(), session)
        .await
        .or_redirect("/")?;
    Ok(View::page(
        "admin_emergencia.html",
        page_context(user, json!({ "numeros": numeros })),
    ))
}

pub async fn emergency_add_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    let result = require_admin(session.as_ref())
        .or_redirect(EMERGENCIA)
        .map(|user| View::page("agregar_emergencia.html", page_context(user, json!({}))));
    flashes.render(result)
}

pub async fn emergency_add_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Form(form): Form<EmergencyNumberForm>,
) -> Response {
    flashes.render(emergency_add_view(&state, session.as_ref(), form).await)
}

async fn emergency_add_view(
    state: &AppState,
    session: Option<&Session>,
    form: EmergencyNumberForm,
) -> PageResult {
    let user = require_admin(session).or_redirect(EMERGENCIA)?;
    let context = page_context(user, json!({ "form": emergency_form_context(&form) }));
    let number = form
        .into_new()
        .or_form(EMERGENCIA, "agregar_emergencia.html", context)?;
    emergency::create(state.repo.as_ref(), session, number)
        .await
        .or_redirect(EMERGENCIA)?;
    Ok(View::redirect_with(
        EMERGENCIA,
        Flash::success("Número de emergencia agregado correctamente"),
    ))
}

pub async fn emergency_edit_page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    flashes.render(emergency_edit_page_view(&state, session.as_ref(), id).await)
}

async fn emergency_edit_page_view(state: &AppState, session: Option<&Session>, id: i64) -> PageResult {
    let user = require_admin(session).or_redirect(EMERGENCIA)?;
    let numero = emergency::get(state.repo.as_ref(), session, id)
        .await
        .or_redirect(EMERGENCIA)?;
    Ok(View::page(
        "editar_emergencia.html",
        page_context(user, json!({ "numero": numero })),
    ))
}

pub async fn emergency_edit_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
    Form(form): Form<EmergencyNumberForm>,
) -> Response {
    flashes.render(emergency_edit_view(&state, session.as_ref(), id, form).await)
}

async fn emergency_edit_view(
    state: &AppState,
    session: Option<&Session>,
    id: i64,
    form: EmergencyNumberForm,
) -> PageResult {
    let user = require_admin(session).or_redirect(EMERGENCIA)?;
    let mut numero = emergency_form_context(&form);
    numero["id"] = json!(id);
    let context = page_context(user, json!({ "numero": numero }));
    let update = form
        .into_update()
        .or_form(EMERGENCIA, "editar_emergencia.html", context)?;
    emergency::update(state.repo.as_ref(), session, id, update)
        .await
        .or_redirect(EMERGENCIA)?;
    Ok(View::redirect_with(
        EMERGENCIA,
        Flash::success("Número de emergencia actualizado correctamente"),
    ))
}

pub async fn emergency_delete(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    let result = emergency::delete(state.repo.as_ref(), session.as_ref(), id)
        .await
        .or_redirect(EMERGENCIA)
        .map(|()| {
            View::redirect_with(
                EMERGENCIA,
                Flash::success("Número de emergencia eliminado correctamente"),
            )
        });
    flashes.render(result)
}

fn emergency_form_context(form: &EmergencyNumberForm) -> serde_json::Value {
    json!({
        "nombre": form.nombre,
        "numero": form.numero,
        "descripcion": form.descripcion,
        "icono": form.icono,
        "categoria": form.categoria,
        "badge": form.badge,
        "activo": form.activo.is_some(),
    })
}

// --- Tips ---

pub async fn tips_list(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
) -> Response {
    flashes.render(tips_list_view(&state, session.as_ref()).await)
}

async fn tips_list_view(state: &AppState, session: Option<&Session>) -> PageResult {
    let user = require_admin(session).or_redirect("/")?;
    let consejos = tips::list(state.repo.as_ref(), session)
        .await
        .or_redirect("/")?;
    Ok(View::page(
        "admin_consejos.html",
        page_context(user, json!({ "consejos": consejos })),
    ))
}

pub async fn tips_add_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    let result = require_admin(session.as_ref())
        .or_redirect(CONSEJOS)
        .map(|user| View::page("agregar_consejo.html", page_context(user, json!({}))));
    flashes.render(result)
}

pub async fn tips_add_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Form(form): Form<TipForm>,
) -> Response {
    flashes.render(tips_add_view(&state, session.as_ref(), form).await)
}

async fn tips_add_view(state: &AppState, session: Option<&Session>, form: TipForm) -> PageResult {
    let user = require_admin(session).or_redirect(CONSEJOS)?;
    let context = page_context(user, json!({ "form": tip_form_context(&form) }));
    let tip = form
        .into_new()
        .or_form(CONSEJOS, "agregar_consejo.html", context)?;
    tips::create(state.repo.as_ref(), session, tip)
        .await
        .or_redirect(CONSEJOS)?;
    Ok(View::redirect_with(
        CONSEJOS,
        Flash::success("Consejo agregado correctamente"),
    ))
}

pub async fn tips_edit_page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    flashes.render(tips_edit_page_view(&state, session.as_ref(), id).await)
}

async fn tips_edit_page_view(state: &AppState, session: Option<&Session>, id: i64) -> PageResult {
    let user = require_admin(session).or_redirect(CONSEJOS)?;
    let consejo = tips::get(state.repo.as_ref(), session, id)
        .await
        .or_redirect(CONSEJOS)?;
    Ok(View::page(
        "editar_consejo.html",
        page_context(user, json!({ "consejo": consejo })),
    ))
}

pub async fn tips_edit_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
    Form(form): Form<TipForm>,
) -> Response {
    flashes.render(tips_edit_view(&state, session.as_ref(), id, form).await)
}

async fn tips_edit_view(
    state: &AppState,
    session: Option<&Session>,
    id: i64,
    form: TipForm,
) -> PageResult {
    let user = require_admin(session).or_redirect(CONSEJOS)?;
    let mut consejo = tip_form_context(&form);
    consejo["id"] = json!(id);
    let context = page_context(user, json!({ "consejo": consejo }));
    let update = form
        .into_update()
        .or_form(CONSEJOS, "editar_consejo.html", context)?;
    tips::update(state.repo.as_ref(), session, id, update)
        .await
        .or_redirect(CONSEJOS)?;
    Ok(View::redirect_with(
        CONSEJOS,
        Flash::success("Consejo actualizado correctamente"),
    ))
}

pub async fn tips_delete(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    let result = tips::delete(state.repo.as_ref(), session.as_ref(), id)
        .await
        .or_redirect(CONSEJOS)
        .map(|()| View::redirect_with(CONSEJOS, Flash::success("Consejo eliminado correctamente")));
    flashes.render(result)
}

fn tip_form_context(form: &TipForm) -> serde_json::Value {
    json!({
        "titulo": form.titulo,
        "descripcion": form.descripcion,
        "icono": form.icono,
        "etiquetas": form.etiquetas,
        "activo": form.activo.is_some(),
    })
}

// --- Quotes of the day ---

pub async fn quotes_list(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
) -> Response {
    flashes.render(quotes_list_view(&state, session.as_ref()).await)
}

async fn quotes_list_view(state: &AppState, session: Option<&Session>) -> PageResult {
    let user = require_admin(session).or_redirect("/")?;
    let frases = quotes::list(state.repo.as_ref(), session)
        .await
        .or_redirect("/")?;
    Ok(View::page(
        "admin_frases.html",
        page_context(user, json!({ "frases": frases })),
    ))
}

pub async fn quotes_add_page(CurrentSession(session): CurrentSession, flashes: Flashes) -> Response {
    let result = require_admin(session.as_ref())
        .or_redirect(FRASES)
        .map(|user| View::page("agregar_frase.html", page_context(user, json!({}))));
    flashes.render(result)
}

/// Publishing a quote retires the previously active one.
pub async fn quotes_add_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Form(form): Form<QuoteForm>,
) -> Response {
    flashes.render(quotes_add_view(&state, session.as_ref(), form).await)
}

async fn quotes_add_view(state: &AppState, session: Option<&Session>, form: QuoteForm) -> PageResult {
    let user = require_admin(session).or_redirect(FRASES)?;
    let context = page_context(
        user,
        json!({ "form": { "frase": form.frase, "autor": form.autor } }),
    );
    let quote = form
        .into_new()
        .or_form(FRASES, "agregar_frase.html", context)?;
    quotes::create(state.repo.as_ref(), session, quote)
        .await
        .or_redirect(FRASES)?;
    Ok(View::redirect_with(
        FRASES,
        Flash::success("Frase del día agregada correctamente"),
    ))
}

pub async fn quotes_edit_page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    flashes.render(quotes_edit_page_view(&state, session.as_ref(), id).await)
}

async fn quotes_edit_page_view(state: &AppState, session: Option<&Session>, id: i64) -> PageResult {
    let user = require_admin(session).or_redirect(FRASES)?;
    let frase = quotes::get(state.repo.as_ref(), session, id)
        .await
        .or_redirect(FRASES)?;
    Ok(View::page(
        "editar_frase.html",
        page_context(user, json!({ "frase": frase })),
    ))
}

pub async fn quotes_edit_submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
    Form(form): Form<QuoteForm>,
) -> Response {
    flashes.render(quotes_edit_view(&state, session.as_ref(), id, form).await)
}

async fn quotes_edit_view(
    state: &AppState,
    session: Option<&Session>,
    id: i64,
    form: QuoteForm,
) -> PageResult {
    let user = require_admin(session).or_redirect(FRASES)?;
    let context = page_context(
        user,
        json!({
            "frase": {
                "id": id,
                "frase": form.frase,
                "autor": form.autor,
                "activa": form.activa.is_some(),
            }
        }),
    );
    let update = form
        .into_update()
        .or_form(FRASES, "editar_frase.html", context)?;
    quotes::update(state.repo.as_ref(), session, id, update)
        .await
        .or_redirect(FRASES)?;
    Ok(View::redirect_with(
        FRASES,
        Flash::success("Frase actualizada correctamente"),
    ))
}

pub async fn quotes_delete(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> Response {
    let result = quotes::delete(state.repo.as_ref(), session.as_ref(), id)
        .await
        .or_redirect(FRASES)
        .map(|()| View::redirect_with(FRASES, Flash::success("Frase eliminada correctamente")));
    flashes.render(result)
}
