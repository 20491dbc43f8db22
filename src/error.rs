use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// ValidationError
///
/// Bad form input. Always detected before any write reaches the store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Las contraseñas no coinciden")]
    PasswordMismatch,

    #[error("El usuario solo puede contener letras y espacios")]
    InvalidUsername,

    #[error("El email debe contener @")]
    InvalidEmail,

    #[error("Rol inválido: {0}")]
    InvalidRole(String),

    #[error("El campo '{0}' es obligatorio")]
    MissingField(&'static str),
}

/// AppError
///
/// The error taxonomy shared by the repository, the services and the handlers.
/// The `Display` text is the user-facing (Spanish) message flashed by the page handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de conexión a la base de datos")]
    Connection(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Usuario o contraseña incorrectos")]
    InvalidCredentials,

    #[error("El usuario o email ya están registrados")]
    DuplicateUser,

    #[error("Debes iniciar sesión para continuar")]
    Unauthorized,

    #[error("No tienes permisos para acceder a esta sección")]
    Forbidden,

    #[error("Registro no encontrado")]
    NotFound,

    #[error("No puedes eliminar tu propio usuario")]
    SelfDeletionForbidden,

    #[error("Error interno del servidor")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::DuplicateUser
            }
            _ => {
                tracing::error!("store error: {:?}", err);
                AppError::Connection(err.to_string())
            }
        }
    }
}

/// JSON rendering, used by the `/api/*` endpoints. Page handlers never reach this: they
/// translate errors into flashed redirects instead (see `view`).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::SelfDeletionForbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateUser => StatusCode::CONFLICT,
            AppError::Connection(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Unauthorized => "No autorizado".to_string(),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(AppError::from(sqlx::Error::RowNotFound), AppError::NotFound));
    }

    #[test]
    fn pool_timeout_maps_to_connection() {
        assert!(matches!(
            AppError::from(sqlx::Error::PoolTimedOut),
            AppError::Connection(_)
        ));
    }

    #[test]
    fn unauthorized_renders_401_json() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn validation_message_is_user_facing() {
        let err = AppError::from(ValidationError::MissingField("nombre"));
        assert_eq!(err.to_string(), "El campo 'nombre' es obligatorio");
    }
}
