use climascalientes::{
    AppState,
    auth::bootstrap_admin,
    config::{AppConfig, Env},
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    scheduler,
    session::{InMemorySessionStore, SessionState, derive_cookie_key},
    weather::{OpenWeatherClient, WeatherState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the store, the weather client, the quote expiry
/// task and the HTTP server, then serves until Ctrl-C or SIGTERM.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose for this crate, quieter for the HTTP stack.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "climascalientes=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Store Initialization
    // Postgres when DATABASE_URL is set (migrations applied on startup), otherwise the
    // in-memory store. AppConfig::load already refuses a production run without it.
    let repo: RepositoryState = match &config.db_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let repo = PostgresRepository::new(pool);
            repo.migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set: using the in-memory store, data is lost on exit");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 5. Administrator provisioning (optional)
    if let Some(admin) = &config.bootstrap_admin {
        if let Err(e) = bootstrap_admin(repo.as_ref(), admin).await {
            tracing::error!("Could not provision the bootstrap admin: {}", e);
        }
    }

    // 6. Sessions, cookie signing and the weather provider
    let sessions = Arc::new(InMemorySessionStore::new()) as SessionState;
    let cookie_key = derive_cookie_key(&config.session_secret);
    let weather = Arc::new(
        OpenWeatherClient::new(&config).expect("FATAL: Failed to build the weather HTTP client."),
    ) as WeatherState;
    if config.weather_api_key.is_empty() {
        tracing::warn!("WEATHER_API_KEY not set: /api/weather will serve the fallback report");
    }

    // 7. Background tasks
    let cancel_token = CancellationToken::new();
    let cleanup = scheduler::start(repo.clone(), config.cleanup_interval, cancel_token.clone());

    // 8. Unified State Assembly
    let port = config.port;
    let app_state = AppState {
        repo,
        sessions,
        weather,
        cookie_key,
        config,
    };

    // 9. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {}: {}", addr, e));

    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await
        .expect("FATAL: HTTP server error");

    // The token is already cancelled; wait for the expiry task to finish its iteration.
    let _ = cleanup.await;
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
    cancel_token.cancel();
}
