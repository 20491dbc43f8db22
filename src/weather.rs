use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

use crate::{
    auth::require_session, config::AppConfig, error::AppError, models::WeatherReport,
    session::Session,
};

pub const LIVE_SOURCE: &str = "OpenWeatherMap";
pub const FALLBACK_SOURCE: &str = "fallback";

/// A place the provider can be asked about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
    Name {
        city: &'static str,
        state: Option<&'static str>,
        country: &'static str,
    },
    Coords {
        lat: f64,
        lon: f64,
    },
}

impl Location {
    /// Query parameters identifying this location. Name lookups send `city,country`
    /// only.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Location::Name { city, country, .. } => vec![("q", format!("{city},{country}"))],
            Location::Coords { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }
}

/// Tried in order; the first accepted answer wins.
pub const CANDIDATES: [Location; 3] = [
    Location::Name {
        city: "Aguascalientes",
        state: Some("Ags"),
        country: "MX",
    },
    Location::Name {
        city: "Aguascalientes",
        state: None,
        country: "MX",
    },
    Location::Coords {
        lat: 21.8853,
        lon: -102.2916,
    },
];

// --- Provider payload (only the fields we read) ---

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OwmResponse {
    pub name: String,
    pub sys: OwmSys,
    pub main: OwmMain,
    pub wind: OwmWind,
    pub weather: Vec<OwmCondition>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OwmSys {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OwmMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: i64,
    pub pressure: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OwmWind {
    /// m/s
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OwmCondition {
    pub description: String,
    pub icon: String,
}

/// Failure of a single provider attempt. Never leaves this module: the fetcher masks it
/// with the fallback report.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider answered with status {0}")]
    Status(u16),

    #[error("provider unavailable: {0}")]
    Upstream(String),
}

/// WeatherProvider
///
/// One attempt against the current-conditions provider for one location. The real client
/// talks HTTP; the mock replays canned answers for tests.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &Location) -> Result<OwmResponse, WeatherError>;
}

/// OpenWeatherClient
///
/// reqwest-backed provider. The per-attempt timeout is applied on the client itself.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(config: &AppConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(config.weather_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.weather_api_url.clone(),
            api_key: config.weather_api_key.clone(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, location: &Location) -> Result<OwmResponse, WeatherError> {
        let mut params = location.query();
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));
        params.push(("lang", "es".to_string()));

        let response = self.http.get(&self.base_url).query(&params).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(WeatherError::Status(response.status().as_u16()));
        }
        Ok(response.json::<OwmResponse>().await?)
    }
}

/// MockWeatherProvider
///
/// Replays one canned answer per call, in order. `None`, or running out of answers, is an
/// upstream failure.
pub struct MockWeatherProvider {
    responses: Vec<Option<OwmResponse>>,
    calls: AtomicUsize,
}

impl MockWeatherProvider {
    pub fn new(responses: Vec<Option<OwmResponse>>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for MockWeatherProvider {
    async fn current(&self, _location: &Location) -> Result<OwmResponse, WeatherError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(call)
            .cloned()
            .flatten()
            .ok_or_else(|| WeatherError::Upstream("mock: simulated failure".to_string()))
    }
}

/// WeatherState
///
/// The concrete type used to share the weather provider across the application state.
pub type WeatherState = Arc<dyn WeatherProvider>;

/// Current conditions for a logged-in user.
pub async fn get_current_weather(
    provider: &dyn WeatherProvider,
    session: Option<&Session>,
) -> Result<WeatherReport, AppError> {
    require_session(session)?;
    Ok(fetch_report(provider).await)
}

/// Walks the candidate list once and returns the first accepted answer, normalised, or
/// the fallback report when none is accepted.
pub async fn fetch_report(provider: &dyn WeatherProvider) -> WeatherReport {
    for location in CANDIDATES.iter() {
        match provider.current(location).await {
            Ok(response) if is_aguascalientes(&response) => {
                tracing::debug!(?location, city = %response.name, "weather accepted");
                return normalise(response);
            }
            Ok(response) => {
                tracing::debug!(
                    ?location,
                    city = %response.name,
                    country = %response.sys.country,
                    "weather response is not for Aguascalientes, trying next location"
                );
            }
            Err(e) => {
                tracing::warn!(?location, "weather attempt failed: {}", e);
            }
        }
    }
    tracing::warn!("no weather location accepted, serving fallback report");
    fallback_report()
}

fn is_aguascalientes(response: &OwmResponse) -> bool {
    let city = response.name.to_lowercase();
    (city.contains("aguascalientes") || city.contains("ags")) && response.sys.country == "MX"
}

fn normalise(response: OwmResponse) -> WeatherReport {
    let (description, icon) = response
        .weather
        .into_iter()
        .next()
        .map(|c| (capitalise(&c.description), c.icon))
        .unwrap_or_default();
    WeatherReport {
        temperature: response.main.temp.round() as i64,
        feels_like: response.main.feels_like.round() as i64,
        humidity: response.main.humidity,
        pressure: response.main.pressure,
        wind_speed: (response.wind.speed * 3.6).round() as i64,
        description,
        icon,
        city: response.name,
        country: response.sys.country,
        source: LIVE_SOURCE.to_string(),
    }
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn fallback_report() -> WeatherReport {
    WeatherReport {
        temperature: 22,
        feels_like: 24,
        humidity: 45,
        pressure: 1013,
        wind_speed: 12,
        description: "Despejado".to_string(),
        icon: "01d".to_string(),
        city: "Aguascalientes".to_string(),
        country: "MX".to_string(),
        source: FALLBACK_SOURCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(name: &str, country: &str) -> OwmResponse {
        OwmResponse {
            name: name.into(),
            sys: OwmSys {
                country: country.into(),
            },
            main: OwmMain {
                temp: 27.6,
                feels_like: 26.4,
                humidity: 20,
                pressure: 1020,
            },
            wind: OwmWind { speed: 4.2 },
            weather: vec![OwmCondition {
                description: "cielo claro".into(),
                icon: "01d".into(),
            }],
        }
    }

    #[test]
    fn location_queries() {
        // The state hint never reaches the provider.
        for candidate in &CANDIDATES[..2] {
            assert_eq!(
                candidate.query(),
                vec![("q", "Aguascalientes,MX".to_string())]
            );
        }
        assert_eq!(
            CANDIDATES[2].query(),
            vec![
                ("lat", "21.8853".to_string()),
                ("lon", "-102.2916".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn first_accepted_answer_is_normalised() {
        let provider = MockWeatherProvider::new(vec![Some(response("Aguascalientes", "MX"))]);
        let report = fetch_report(&provider).await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(report.temperature, 28);
        assert_eq!(report.feels_like, 26);
        assert_eq!(report.wind_speed, 15);
        assert_eq!(report.description, "Cielo claro");
        assert_eq!(report.source, LIVE_SOURCE);
    }

    #[tokio::test]
    async fn mismatched_city_moves_to_next_candidate() {
        let provider = MockWeatherProvider::new(vec![
            Some(response("Guadalajara", "MX")),
            Some(response("Aguascalientes", "US")),
            Some(response("Ags", "MX")),
        ]);
        let report = fetch_report(&provider).await;
        assert_eq!(provider.calls(), 3);
        assert_eq!(report.city, "Ags");
    }

    #[tokio::test]
    async fn every_failure_yields_fallback() {
        let provider = MockWeatherProvider::failing();
        let report = fetch_report(&provider).await;
        assert_eq!(provider.calls(), CANDIDATES.len());
        assert_eq!(report, fallback_report());
    }

    #[tokio::test]
    async fn weather_requires_a_session() {
        let provider = MockWeatherProvider::failing();
        assert!(matches!(
            get_current_weather(&provider, None).await,
            Err(AppError::Unauthorized)
        ));
        assert_eq!(provider.calls(), 0);
    }
}
