use crate::{
    AppState,
    handlers::{content, users},
};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Administrator-only screens. No session redirects to /login; any other role is sent
/// back to / with a flashed permission error. Deletions are plain GET links.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- User management ---
        // GET /dashboard?busqueda=
        // Numeric search is an exact id lookup; any other text matches nothing.
        .route("/dashboard", get(users::dashboard))
        .route(
            "/crear_usuario",
            get(users::create_user_page).post(users::create_user_submit),
        )
        .route(
            "/editar_usuario/{id}",
            get(users::edit_user_page).post(users::edit_user_submit),
        )
        .route("/eliminar_usuario/{id}", get(users::delete_user))
        .nest("/admin", content_routes())
}

/// Content management, nested under /admin.
fn content_routes() -> Router<AppState> {
    Router::new()
        // --- Emergency numbers ---
        .route("/emergencia", get(content::emergency_list))
        .route(
            "/emergencia/agregar",
            get(content::emergency_add_page).post(content::emergency_add_submit),
        )
        .route(
            "/emergencia/editar/{id}",
            get(content::emergency_edit_page).post(content::emergency_edit_submit),
        )
        .route("/emergencia/eliminar/{id}", get(content::emergency_delete))
        // --- Weather tips ---
        .route("/consejos", get(content::tips_list))
        .route(
            "/consejos/agregar",
            get(content::tips_add_page).post(content::tips_add_submit),
        )
        .route(
            "/consejos/editar/{id}",
            get(content::tips_edit_page).post(content::tips_edit_submit),
        )
        .route("/consejos/eliminar/{id}", get(content::tips_delete))
        // --- Quote of the day ---
        // Adding a quote makes it the only active one.
        .route("/frases", get(content::quotes_list))
        .route(
            "/frases/agregar",
            get(content::quotes_add_page).post(content::quotes_add_submit),
        )
        .route(
            "/frases/editar/{id}",
            get(content::quotes_edit_page).post(content::quotes_edit_submit),
        )
        .route("/frases/eliminar/{id}", get(content::quotes_delete))
}
