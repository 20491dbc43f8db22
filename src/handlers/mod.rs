//! HTTP handlers
//!
//! Page handlers delegate to a private `*_view` function returning [`PageResult`] and hand
//! the outcome to [`Flashes::render`](crate::view::Flashes::render). JSON handlers under
//! `api` and `weather` carry the OpenAPI annotations.

use serde_json::{Value, json};

use crate::session::{Session, SessionUser};
use crate::view::{FlashedError, View};

pub mod api;
pub mod auth;
pub mod content;
pub mod users;
pub mod weather;

pub type PageResult = Result<View, FlashedError>;

/// Context shared by every page rendered for a logged-in user.
fn user_context(user: &SessionUser) -> Value {
    json!({ "username": user.username, "rol": user.role })
}

/// `user_context` merged with page-specific entries.
fn page_context(user: &SessionUser, extra: Value) -> Value {
    let mut context = user_context(user);
    if let (Some(base), Value::Object(extra)) = (context.as_object_mut(), extra) {
        base.extend(extra);
    }
    context
}

/// Landing page context: anonymous visitors get an empty one.
fn optional_user_context(session: Option<&Session>) -> Value {
    session
        .map(|s| user_context(&s.user))
        .unwrap_or_else(|| json!({}))
}
