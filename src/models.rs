use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::ValidationError;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field stored in `usuarios.rol`. Only `Admin` unlocks the content-management
/// screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ValidationError::InvalidRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// A row of the `usuarios` table. The password hash never leaves the server: it is
/// skipped during serialization so user listings can be handed to a page as-is.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    #[sqlx(rename = "rol", try_from = "String")]
    pub role: Role,
}

/// EmergencyNumber
///
/// A row of `numeros_emergencia`. Publicly listed only while `activo` is true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct EmergencyNumber {
    #[ts(type = "number")]
    pub id: i64,
    pub nombre: String,
    pub numero: String,
    pub descripcion: String,
    pub icono: String,
    pub categoria: String,
    pub badge: Option<String>,
    pub activo: bool,
}

/// Tip (consejo del clima)
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Tip {
    #[ts(type = "number")]
    pub id: i64,
    pub titulo: String,
    pub descripcion: String,
    pub icono: String,
    pub etiquetas: Option<String>,
    pub activo: bool,
    #[ts(type = "string")]
    pub fecha_creacion: DateTime<Utc>,
}

/// Quote (frase del día)
///
/// At most one row has `activa = true` at any time; the repository enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Quote {
    #[ts(type = "number")]
    pub id: i64,
    pub frase: String,
    pub autor: Option<String>,
    pub activa: bool,
    #[ts(type = "string")]
    pub fecha_publicacion: DateTime<Utc>,
}

/// WeatherReport
///
/// Normalised current conditions. `source` tells live data ("OpenWeatherMap") apart from
/// the canned fallback ("fallback").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct WeatherReport {
    #[ts(type = "number")]
    pub temperature: i64,
    #[ts(type = "number")]
    pub feels_like: i64,
    #[ts(type = "number")]
    pub humidity: i64,
    #[ts(type = "number")]
    pub pressure: i64,
    /// km/h
    #[ts(type = "number")]
    pub wind_speed: i64,
    pub description: String,
    pub icon: String,
    pub city: String,
    pub country: String,
    pub source: String,
}

// --- Validated inputs (what the repository receives) ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial user update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEmergencyNumber {
    pub nombre: String,
    pub numero: String,
    pub descripcion: String,
    pub icono: String,
    pub categoria: String,
    pub badge: Option<String>,
    pub activo: bool,
}

/// Partial update. `badge: Some(None)` clears the badge.
#[derive(Debug, Clone, Default)]
pub struct EmergencyNumberUpdate {
    pub nombre: Option<String>,
    pub numero: Option<String>,
    pub descripcion: Option<String>,
    pub icono: Option<String>,
    pub categoria: Option<String>,
    pub badge: Option<Option<String>>,
    pub activo: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewTip {
    pub titulo: String,
    pub descripcion: String,
    pub icono: String,
    pub etiquetas: Option<String>,
    pub activo: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TipUpdate {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub icono: Option<String>,
    pub etiquetas: Option<Option<String>>,
    pub activo: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewQuote {
    pub frase: String,
    pub autor: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuoteUpdate {
    pub frase: Option<String>,
    pub autor: Option<Option<String>>,
    pub activa: Option<bool>,
}

// --- Request Payloads (form inputs) ---
//
// Every field is optional at the decoding layer so that a missing field surfaces as a
// flashed `MissingField` instead of a bare 422 from the extractor.

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterForm {
    /// Registration checks, in order: confirmation, username charset, email shape.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        check_identity(Some(&self.username), Some(&self.email))?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        Ok(())
    }
}

/// Admin "crear usuario" form.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateUserForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub rol: Option<String>,
}

/// Admin create input once the required fields are known to be present.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl CreateUserForm {
    pub fn validate(self) -> Result<CreateUserInput, ValidationError> {
        let username = required(self.username, "username")?;
        let email = required(self.email, "email")?;
        let password = required(self.password, "password")?;
        if Some(&password) != self.confirm_password.as_ref() {
            return Err(ValidationError::PasswordMismatch);
        }
        check_identity(Some(&username), Some(&email))?;
        let role = required(self.rol, "rol")?.parse()?;
        Ok(CreateUserInput {
            username,
            email,
            password,
            role,
        })
    }
}

/// Admin "editar usuario" form. An empty `nueva_password` leaves the hash untouched.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EditUserForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub rol: Option<String>,
    pub nueva_password: Option<String>,
}

/// Admin edit input: the plain new password is hashed by the service.
#[derive(Debug, Clone, Default)]
pub struct EditUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub new_password: Option<String>,
}

impl EditUserForm {
    pub fn validate(self) -> Result<EditUserInput, ValidationError> {
        let role = match present(self.rol, "rol")? {
            Some(raw) => Some(raw.parse()?),
            None => None,
        };
        let username = present(self.username, "username")?;
        let email = present(self.email, "email")?;
        check_identity(username.as_deref(), email.as_deref())?;
        Ok(EditUserInput {
            username,
            email,
            role,
            new_password: optional(self.nueva_password),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EmergencyNumberForm {
    pub nombre: Option<String>,
    pub numero: Option<String>,
    pub descripcion: Option<String>,
    pub icono: Option<String>,
    pub categoria: Option<String>,
    pub badge: Option<String>,
    pub activo: Option<String>,
}

impl EmergencyNumberForm {
    pub fn into_new(self) -> Result<NewEmergencyNumber, ValidationError> {
        Ok(NewEmergencyNumber {
            nombre: required(self.nombre, "nombre")?,
            numero: required(self.numero, "numero")?,
            descripcion: required(self.descripcion, "descripcion")?,
            icono: required(self.icono, "icono")?,
            categoria: required(self.categoria, "categoria")?,
            badge: optional(self.badge),
            activo: true,
        })
    }

    /// Edit forms post every field; an unchecked `activo` box is simply absent.
    pub fn into_update(self) -> Result<EmergencyNumberUpdate, ValidationError> {
        Ok(EmergencyNumberUpdate {
            nombre: present(self.nombre, "nombre")?,
            numero: present(self.numero, "numero")?,
            descripcion: present(self.descripcion, "descripcion")?,
            icono: present(self.icono, "icono")?,
            categoria: present(self.categoria, "categoria")?,
            badge: self.badge.map(|b| optional(Some(b))),
            activo: Some(checkbox(self.activo.as_deref())),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TipForm {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub icono: Option<String>,
    pub etiquetas: Option<String>,
    pub activo: Option<String>,
}

impl TipForm {
    pub fn into_new(self) -> Result<NewTip, ValidationError> {
        Ok(NewTip {
            titulo: required(self.titulo, "titulo")?,
            descripcion: required(self.descripcion, "descripcion")?,
            icono: required(self.icono, "icono")?,
            etiquetas: optional(self.etiquetas),
            activo: true,
        })
    }

    pub fn into_update(self) -> Result<TipUpdate, ValidationError> {
        Ok(TipUpdate {
            titulo: present(self.titulo, "titulo")?,
            descripcion: present(self.descripcion, "descripcion")?,
            icono: present(self.icono, "icono")?,
            etiquetas: self.etiquetas.map(|e| optional(Some(e))),
            activo: Some(checkbox(self.activo.as_deref())),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct QuoteForm {
    pub frase: Option<String>,
    pub autor: Option<String>,
    pub activa: Option<String>,
}

impl QuoteForm {
    pub fn into_new(self) -> Result<NewQuote, ValidationError> {
        Ok(NewQuote {
            frase: required(self.frase, "frase")?,
            autor: optional(self.autor),
        })
    }

    pub fn into_update(self) -> Result<QuoteUpdate, ValidationError> {
        Ok(QuoteUpdate {
            frase: present(self.frase, "frase")?,
            autor: self.autor.map(|a| optional(Some(a))),
            activa: Some(checkbox(self.activa.as_deref())),
        })
    }
}

/// `?busqueda=` on the user dashboard.
#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
pub struct UserSearch {
    pub busqueda: Option<String>,
}

// --- Field helpers ---

/// Letters (any script) and spaces only, with at least one letter.
pub fn is_valid_username(username: &str) -> bool {
    let mut letters = 0;
    for c in username.chars() {
        if c.is_alphabetic() {
            letters += 1;
        } else if c != ' ' {
            return false;
        }
    }
    letters > 0
}

/// Username charset and email shape, shared by every path that writes a user row.
/// Absent values are not checked.
fn check_identity(username: Option<&str>, email: Option<&str>) -> Result<(), ValidationError> {
    if username.is_some_and(|u| !is_valid_username(u)) {
        return Err(ValidationError::InvalidUsername);
    }
    if email.is_some_and(|e| !e.contains('@')) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Absent stays absent; a posted-but-blank required field is an error.
fn present(value: Option<String>, field: &'static str) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) => required(Some(v), field).map(Some),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn checkbox(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") | Some("0") | Some("false") | Some("off") => false,
        Some(_) => true,
    }
}
