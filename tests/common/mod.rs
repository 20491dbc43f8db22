//! Shared harness for the router-level tests: an in-memory application plus a tiny
//! cookie jar so consecutive requests behave like one browser.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use climascalientes::{
    AppConfig, AppState, InMemoryRepository, InMemorySessionStore, MockWeatherProvider,
    auth::hash_password,
    create_router,
    models::{NewUser, Role, User},
    repository::{Repository, RepositoryState},
    session::{SessionState, derive_cookie_key},
    weather::WeatherState,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::util::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub sessions: Arc<InMemorySessionStore>,
    jar: BTreeMap<String, String>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_weather(MockWeatherProvider::failing())
    }

    pub fn with_weather(weather: MockWeatherProvider) -> Self {
        let config = AppConfig::default();
        let repo = Arc::new(InMemoryRepository::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let state = AppState {
            repo: repo.clone() as RepositoryState,
            sessions: sessions.clone() as SessionState,
            weather: Arc::new(weather) as WeatherState,
            cookie_key: derive_cookie_key(&config.session_secret),
            config,
        };
        Self {
            router: create_router(state),
            repo,
            sessions,
            jar: BTreeMap::new(),
        }
    }

    pub async fn seed_user(&self, username: &str, password: &str, role: Role) -> User {
        self.repo
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@x.com", username.replace(' ', ".")),
                password_hash: hash_password(password).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri);
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn login(&mut self, username: &str, password: &str) {
        let response = self
            .post_form(
                "/login",
                &format!("username={}&password={}", username.replace(' ', "+"), password),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/clima");
        // Follow the redirect so the login flash is drained like in a browser.
        let response = self.get("/clima").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Overwrites a cookie in the jar, bypassing the server.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.jar.insert(name.to_string(), value.to_string());
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.jar.contains_key(name)
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name).cloned()
    }

    async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if !self.jar.is_empty() {
            let cookie = self
                .jar
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }
        let response = self.router.clone().oneshot(request).await.unwrap();
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            let expired = raw.to_ascii_lowercase().contains("max-age=0");
            if expired || value.is_empty() {
                self.jar.remove(name);
            } else {
                self.jar.insert(name.to_string(), value.to_string());
            }
        }
        response
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Messages of the flashes carried by a page document.
pub fn flash_messages(document: &Value) -> Vec<String> {
    document["flashes"]
        .as_array()
        .map(|flashes| {
            flashes
                .iter()
                .filter_map(|f| f["message"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
