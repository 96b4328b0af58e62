use std::env;

use thiserror::Error;

use crate::auth::SessionMode;

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment cannot produce a usable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingInProduction(&'static str),
    #[error("SESSION_SECRET must be set when SESSION_MODE=token")]
    MissingSessionSecret,
    #[error("unknown SESSION_MODE '{0}' (expected 'cookie' or 'token')")]
    UnknownSessionMode(String),
}

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Fixed owner identifier every resource row is scoped to.
    pub owner_id: String,
    // Directory holding the built frontend bundle served behind the guard.
    pub static_dir: String,
    // How the guard establishes the session assertion.
    pub session_mode: SessionMode,
    // HMAC secret for signed session tokens. Only read in token mode.
    pub session_secret: String,
}

/// Env
///
/// Runtime context: local development or production.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe defaults used by tests and local scaffolding. No database, cookie sessions.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            bind_addr: "127.0.0.1:3000".to_string(),
            owner_id: "vico".to_string(),
            static_dir: "./public".to_string(),
            session_mode: SessionMode::Cookie,
            session_secret: "vico-local-session-secret".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to start
    /// without a database, and token sessions refuse to start without a secret.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if env == Env::Production && db_url.is_none() {
            return Err(ConfigError::MissingInProduction("DATABASE_URL"));
        }

        let session_mode = match env::var("SESSION_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => SessionMode::Cookie,
        };

        let session_secret = match (session_mode, env::var("SESSION_SECRET")) {
            (_, Ok(secret)) if !secret.is_empty() => secret,
            (SessionMode::Token, _) => return Err(ConfigError::MissingSessionSecret),
            (SessionMode::Cookie, _) => AppConfig::default().session_secret,
        };

        Ok(Self {
            env,
            db_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            owner_id: env::var("OWNER_ID").unwrap_or_else(|_| "vico".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./public".to_string()),
            session_mode,
            session_secret,
        })
    }
}
