use std::env;
use std::time::Duration;

/// Default OpenWeatherMap "current weather" endpoint.
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Session secret used when running locally without SECRET_KEY.
const LOCAL_SESSION_SECRET: &str = "clave-temporal-desarrollo";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and then
/// shared, immutable, through the application state (pulled into handlers via FromRef).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Runtime environment marker. Controls logging format and fail-fast behaviour.
    pub env: Env,
    // Secret from which the cookie signing key is derived.
    pub session_secret: String,
    // OpenWeatherMap API key. An empty key simply makes every live attempt fail.
    pub weather_api_key: String,
    pub weather_api_url: String,
    // Per-attempt timeout for the weather provider.
    pub weather_timeout: Duration,
    // Period of the quote expiry task.
    pub cleanup_interval: Duration,
    pub port: u16,
    // Optional administrator account created at startup.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the administrator account provisioned at startup.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Env
///
/// Defines the runtime context: local development (pretty logs, in-memory store allowed)
/// versus production (JSON logs, every secret mandatory).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration used by tests.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            session_secret: "super-secure-test-secret-value-local".to_string(),
            weather_api_key: String::new(),
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            weather_timeout: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(3600),
            port: 5000,
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the process environment and implements the
    /// **fail-fast** principle for production.
    ///
    /// # Panics
    /// Panics in production when SECRET_KEY or DATABASE_URL is missing, and in any
    /// environment when a numeric variable cannot be parsed or a period is zero.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (db_url, session_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
                env::var("SECRET_KEY").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
            ),
        };

        let bootstrap_admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                let email = env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| format!("{}@climascalientes.local", username));
                Some(BootstrapAdmin {
                    username,
                    email,
                    password,
                })
            }
            _ => None,
        };

        Self {
            db_url,
            env,
            session_secret,
            weather_api_key: env::var("WEATHER_API_KEY").unwrap_or_default(),
            weather_api_url: env::var("WEATHER_API_URL")
                .unwrap_or_else(|_| DEFAULT_WEATHER_API_URL.to_string()),
            weather_timeout: parse_period("WEATHER_TIMEOUT_SECS", 10),
            cleanup_interval: parse_period("QUOTE_CLEANUP_INTERVAL_SECS", 3600),
            port: parse_var("PORT", 5000),
            bootstrap_admin,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {} must be a number, got {:?}", name, raw)),
        Err(_) => default,
    }
}

/// A whole number of seconds, at least one.
fn parse_period(name: &str, default_secs: u64) -> Duration {
    let secs: u64 = parse_var(name, default_secs);
    if secs == 0 {
        panic!("FATAL: {} must be greater than zero", name);
    }
    Duration::from_secs(secs)
}
