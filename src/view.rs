//! Page handler results
//!
//! Page handlers return `Result<View, FlashedError>`; `Flashes::render` turns that value
//! into an HTTP response. Templating is outside this crate: a page is answered with a
//! JSON document naming the template and the context it should be rendered with.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_cookies::{Cookie, Cookies, Key};

use crate::error::AppError;

pub const FLASH_COOKIE: &str = "climas_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }
}

/// Successful outcome of a page handler.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Page { template: &'static str, context: Value },
    Redirect { to: String, flash: Option<Flash> },
}

impl View {
    pub fn page(template: &'static str, context: Value) -> Self {
        View::Page { template, context }
    }

    pub fn redirect(to: impl Into<String>) -> Self {
        View::Redirect {
            to: to.into(),
            flash: None,
        }
    }

    pub fn redirect_with(to: impl Into<String>, flash: Flash) -> Self {
        View::Redirect {
            to: to.into(),
            flash: Some(flash),
        }
    }
}

/// Where a failed page request ends up.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Redirect(String),
    /// Re-render the submitted form (nothing was written).
    Form { template: &'static str, context: Value },
}

/// Failed outcome of a page handler: an error message plus where to show it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashedError {
    pub flash: Flash,
    pub target: Target,
}

impl FlashedError {
    pub fn redirect(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            flash: Flash::error(message),
            target: Target::Redirect(to.into()),
        }
    }
}

/// Presentation of service errors on page handlers.
///
/// Missing session goes to the login page, missing role to the home page. Input errors
/// (validation, duplicates, bad credentials) re-render the form when one is given;
/// everything else is flashed on `listing`.
pub trait FlashResult<T> {
    fn or_redirect(self, listing: &str) -> Result<T, FlashedError>;

    fn or_form(
        self,
        listing: &str,
        template: &'static str,
        context: Value,
    ) -> Result<T, FlashedError>;
}

impl<T, E: Into<AppError>> FlashResult<T> for Result<T, E> {
    fn or_redirect(self, listing: &str) -> Result<T, FlashedError> {
        self.map_err(|err| flashed(err.into(), listing, None))
    }

    fn or_form(
        self,
        listing: &str,
        template: &'static str,
        context: Value,
    ) -> Result<T, FlashedError> {
        self.map_err(|err| flashed(err.into(), listing, Some((template, context))))
    }
}

fn flashed(err: AppError, listing: &str, form: Option<(&'static str, Value)>) -> FlashedError {
    let flash = Flash::error(err.to_string());
    let target = match (&err, form) {
        (AppError::Unauthorized, _) => Target::Redirect("/login".to_string()),
        (AppError::Forbidden, _) => Target::Redirect("/".to_string()),
        (
            AppError::Validation(_) | AppError::DuplicateUser | AppError::InvalidCredentials,
            Some((template, context)),
        ) => Target::Form { template, context },
        _ => Target::Redirect(listing.to_string()),
    };
    FlashedError { flash, target }
}

/// Page document sent in place of rendered HTML.
#[derive(Debug, Serialize, Deserialize)]
pub struct PageDocument {
    pub template: String,
    pub flashes: Vec<Flash>,
    pub context: Value,
}

/// Flashes
///
/// Extractor giving a handler access to the flash queue, which travels between requests
/// in a signed cookie. Requires the `CookieManagerLayer`.
pub struct Flashes {
    cookies: Cookies,
    key: Key,
}

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state).await?;
        Ok(Self {
            cookies,
            key: Key::from_ref(state),
        })
    }
}

impl Flashes {
    pub fn new(cookies: Cookies, key: Key) -> Self {
        Self { cookies, key }
    }

    /// Turns a handler result into a response. Pages drain the pending flashes into
    /// their document; redirects queue theirs for the next page.
    pub fn render(self, result: Result<View, FlashedError>) -> Response {
        match result {
            Ok(View::Page { template, context }) => {
                self.page(StatusCode::OK, template, context, None)
            }
            Ok(View::Redirect { to, flash }) => {
                if let Some(flash) = flash {
                    self.push(flash);
                }
                Redirect::to(&to).into_response()
            }
            Err(FlashedError {
                flash,
                target: Target::Redirect(to),
            }) => {
                self.push(flash);
                Redirect::to(&to).into_response()
            }
            Err(FlashedError {
                flash,
                target: Target::Form { template, context },
            }) => self.page(StatusCode::UNPROCESSABLE_ENTITY, template, context, Some(flash)),
        }
    }

    fn page(
        &self,
        status: StatusCode,
        template: &'static str,
        context: Value,
        extra: Option<Flash>,
    ) -> Response {
        let mut flashes = self.take();
        flashes.extend(extra);
        let document = PageDocument {
            template: template.to_string(),
            flashes,
            context,
        };
        (status, Json(document)).into_response()
    }

    fn push(&self, flash: Flash) {
        let mut pending = self.pending();
        pending.push(flash);
        match serde_json::to_vec(&pending) {
            Ok(bytes) => {
                let cookie = Cookie::build((FLASH_COOKIE, URL_SAFE_NO_PAD.encode(bytes)))
                    .path("/")
                    .http_only(true)
                    .build();
                self.cookies.signed(&self.key).add(cookie);
            }
            Err(e) => tracing::warn!("could not encode flash messages: {:?}", e),
        }
    }

    fn take(&self) -> Vec<Flash> {
        let pending = self.pending();
        if !pending.is_empty() {
            self.cookies
                .remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
        }
        pending
    }

    fn pending(&self) -> Vec<Flash> {
        self.cookies
            .signed(&self.key)
            .get(FLASH_COOKIE)
            .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }
}
