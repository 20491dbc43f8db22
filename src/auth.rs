use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use tower_cookies::{Cookies, Key};

use crate::{
    config::BootstrapAdmin,
    error::AppError,
    models::{LoginForm, NewUser, RegisterForm, Role, User},
    repository::Repository,
    session::{Session, SessionState, SessionStore, SessionUser, session_from_cookies},
};

/// Hash a password with argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored PHC hash. An unparseable hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is not a valid PHC string: {}", e);
            false
        }
    }
}

/// Login
///
/// Checks the credentials and opens a session. Unknown user and wrong password are
/// indistinguishable to the caller.
pub async fn login(
    repo: &dyn Repository,
    sessions: &dyn SessionStore,
    form: &LoginForm,
) -> Result<Session, AppError> {
    let user = repo
        .get_user_by_username(form.username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let session = sessions.create(&user);
    tracing::info!(user_id = user.id, role = %user.role, "user logged in");
    Ok(session)
}

/// Register
///
/// Self-registration always yields a plain `user`. Validation runs before any store
/// access, so rejected input never writes.
pub async fn register(repo: &dyn Repository, form: RegisterForm) -> Result<User, AppError> {
    form.validate()?;

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    if repo.user_exists(&username, &email).await? {
        return Err(AppError::DuplicateUser);
    }

    let user = repo
        .create_user(NewUser {
            username,
            email,
            password_hash: hash_password(&form.password)?,
            role: Role::User,
        })
        .await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok(user)
}

/// Ends the session, if any. Calling it without a session is harmless.
pub fn logout(sessions: &dyn SessionStore, session: Option<&Session>) {
    if let Some(session) = session {
        sessions.delete(&session.id);
        tracing::info!(user_id = session.user.user_id, "user logged out");
    }
}

/// Creates the configured administrator account unless the username or email is taken.
/// Returns whether an account was created.
pub async fn bootstrap_admin(
    repo: &dyn Repository,
    admin: &BootstrapAdmin,
) -> Result<bool, AppError> {
    if repo.user_exists(&admin.username, &admin.email).await? {
        tracing::debug!("bootstrap admin '{}' already present", admin.username);
        return Ok(false);
    }
    repo.create_user(NewUser {
        username: admin.username.clone(),
        email: admin.email.clone(),
        password_hash: hash_password(&admin.password)?,
        role: Role::Admin,
    })
    .await?;
    tracing::info!("bootstrap admin '{}' created", admin.username);
    Ok(true)
}

// --- Access guard ---

/// Any authenticated user.
pub fn require_session(session: Option<&Session>) -> Result<&SessionUser, AppError> {
    session.map(|s| &s.user).ok_or(AppError::Unauthorized)
}

pub fn require_role(user: &SessionUser, role: Role) -> Result<(), AppError> {
    if user.role == role {
        Ok(())
    } else {
        tracing::warn!(
            user_id = user.user_id,
            "role '{}' required, user has '{}'",
            role,
            user.role
        );
        Err(AppError::Forbidden)
    }
}

/// Authenticated administrator: `Unauthorized` without a session, `Forbidden` for any
/// other role.
pub fn require_admin(session: Option<&Session>) -> Result<&SessionUser, AppError> {
    let user = require_session(session)?;
    require_role(user, Role::Admin)?;
    Ok(user)
}

/// CurrentSession Extractor
///
/// Resolves the session referenced by the signed session cookie. Never rejects for a
/// missing or invalid session: the access decision belongs to the guard functions above,
/// so every handler can map the outcome to its own redirect or status code.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state).await?;
        let sessions = SessionState::from_ref(state);
        let key = Key::from_ref(state);
        Ok(CurrentSession(session_from_cookies(
            &cookies,
            &key,
            sessions.as_ref(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use crate::session::InMemorySessionStore;
    use chrono::Utc;

    fn register_form(username: &str, email: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: "Secret1!".into(),
            confirm_password: "Secret1!".into(),
        }
    }

    fn session(role: Role) -> Session {
        Session {
            id: crate::session::SessionId::generate(),
            user: SessionUser {
                user_id: 1,
                username: "ana".into(),
                role,
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hash_is_salted_and_verifies() {
        let a = hash_password("Secret1!").unwrap();
        let b = hash_password("Secret1!").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("Secret1!", &a));
        assert!(!verify_password("secret1!", &a));
        assert!(!verify_password("Secret1!", "not-a-hash"));
    }

    #[tokio::test]
    async fn register_then_login() {
        let repo = InMemoryRepository::new();
        let sessions = InMemorySessionStore::new();
        let user = register(&repo, register_form("ana perez", "ana@x.com"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "Secret1!");

        let form = LoginForm {
            username: "ana perez".into(),
            password: "Secret1!".into(),
        };
        let session = login(&repo, &sessions, &form).await.unwrap();
        assert_eq!(session.user.user_id, user.id);

        let wrong = LoginForm {
            password: "nope".into(),
            ..form
        };
        assert!(matches!(
            login(&repo, &sessions, &wrong).await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let repo = InMemoryRepository::new();
        register(&repo, register_form("ana", "ana@x.com"))
            .await
            .unwrap();
        let err = register(&repo, register_form("otra", "ana@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUser));
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bootstrap_admin_runs_once() {
        let repo = InMemoryRepository::new();
        let admin = BootstrapAdmin {
            username: "admin".into(),
            email: "admin@x.com".into(),
            password: "Admin123!".into(),
        };
        assert!(bootstrap_admin(&repo, &admin).await.unwrap());
        assert!(!bootstrap_admin(&repo, &admin).await.unwrap());
        let stored = repo.get_user_by_username("admin").await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);
    }

    #[test]
    fn guard_distinguishes_missing_session_from_wrong_role() {
        assert!(matches!(require_admin(None), Err(AppError::Unauthorized)));
        let user = session(Role::User);
        assert!(matches!(
            require_admin(Some(&user)),
            Err(AppError::Forbidden)
        ));
        let admin = session(Role::Admin);
        assert_eq!(require_admin(Some(&admin)).unwrap().username, "ana");
        assert!(require_session(Some(&user)).is_ok());
    }
}
