use std::process::ExitCode;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vico_dashboard::{
    AppState, Repositories, SessionResolver, StorageKind,
    config::{AppConfig, Env},
    create_router,
};

/// main
///
/// Loads configuration, sets up logging and storage, then serves the dashboard.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins; otherwise a verbose default for local work.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vico_dashboard=debug,tower_http=info".into());

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

    tracing::info!(
        "Application starting in {:?} mode, sessions via {:?}",
        config.env,
        config.session_mode
    );

    let (repos, storage) = match config.db_url.as_deref() {
        Some(db_url) => {
            let pool = match PgPoolOptions::new().max_connections(5).connect(db_url).await {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!("Failed to connect to Postgres: {e}");
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::error!("Failed to run migrations: {e}");
                return ExitCode::FAILURE;
            }
            (Repositories::postgres(pool, &config.owner_id), StorageKind::Postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data is lost on exit");
            (Repositories::memory(&config.owner_id), StorageKind::Memory)
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        repos,
        storage,
        session: SessionResolver::new(config.session_mode, config.session_secret.clone()),
        config,
    };

    let app = create_router(state);

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
