//! Server-side sessions
//!
//! The client only ever holds an opaque token in a signed cookie; identity and role live
//! in the `SessionStore`, which is injected through the application state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};
use tower_cookies::{Cookie, Cookies, Key};

use crate::models::{Role, User};

pub const SESSION_COOKIE: &str = "climas_session";

/// Opaque session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }
}

/// The authenticated identity carried by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user: SessionUser,
    pub created_at: DateTime<Utc>,
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a user
    fn create(&self, user: &User) -> Session;

    /// Get a session by ID
    fn get(&self, session_id: &SessionId) -> Option<Session>;

    /// Delete a session. Deleting an unknown session is a no-op.
    fn delete(&self, session_id: &SessionId);

    /// Drop every session held by `user_id`. Returns how many were removed.
    fn delete_user_sessions(&self, user_id: i64) -> usize;
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

/// In-memory session store. Sessions live as long as the process.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, user: &User) -> Session {
        let session = Session {
            id: SessionId::generate(),
            user: SessionUser {
                user_id: user.id,
                username: user.username.clone(),
                role: user.role,
            },
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id.clone(), session.clone());
        session
    }

    fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn delete(&self, session_id: &SessionId) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    fn delete_user_sessions(&self, user_id: i64) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| session.user.user_id != user_id);
        before - sessions.len()
    }
}

/// Derives the cookie signing key from the configured secret of any length.
pub fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Helper to get the current session from the signed session cookie.
/// A tampered, unknown or revoked token yields `None`.
pub fn session_from_cookies(
    cookies: &Cookies,
    key: &Key,
    store: &dyn SessionStore,
) -> Option<Session> {
    cookies
        .signed(key)
        .get(SESSION_COOKIE)
        .and_then(|c| store.get(&SessionId(c.value().to_string())))
}

/// Helper to set the session cookie
pub fn set_session_cookie(cookies: &Cookies, key: &Key, session_id: &SessionId) {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .build();
    cookies.signed(key).add(cookie);
}

/// Helper to clear the session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: "ana".into(),
            email: "ana@x.com".into(),
            password_hash: String::new(),
            role: Role::Admin,
        }
    }

    #[test]
    fn created_session_carries_identity() {
        let store = InMemorySessionStore::new();
        let session = store.create(&user());
        let found = store.get(&session.id).unwrap();
        assert_eq!(found.user.user_id, 7);
        assert_eq!(found.user.role, Role::Admin);
    }

    #[test]
    fn delete_is_idempotent() {
        let store = InMemorySessionStore::new();
        let session = store.create(&user());
        store.delete(&session.id);
        store.delete(&session.id);
        assert!(store.get(&session.id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn user_sessions_are_dropped_together() {
        let store = InMemorySessionStore::new();
        let first = store.create(&user());
        let second = store.create(&user());
        let other = store.create(&User {
            id: 8,
            ..user()
        });

        assert_eq!(store.delete_user_sessions(7), 2);
        assert!(store.get(&first.id).is_none());
        assert!(store.get(&second.id).is_none());
        assert!(store.get(&other.id).is_some());
        assert_eq!(store.delete_user_sessions(7), 0);
    }

    #[test]
    fn short_secrets_still_yield_a_key() {
        let a = derive_cookie_key("x");
        let b = derive_cookie_key("x");
        assert_eq!(a.master(), b.master());
    }
}
