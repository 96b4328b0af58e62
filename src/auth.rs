use std::{str::FromStr, time::Duration};

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::config::ConfigError;

/// Cookie carrying the authentication flag.
pub const AUTH_COOKIE: &str = "vico_auth";
/// Cookie carrying the free-text role label.
pub const ROLE_COOKIE: &str = "vico_role";
/// Cookie carrying a signed session token (token mode only).
pub const SESSION_COOKIE: &str = "vico_session";

/// The only `vico_auth` value that counts as signed in.
pub const AUTHENTICATED: &str = "authenticated";
/// Role assumed when no role is asserted.
pub const DEFAULT_ROLE: &str = "admin";
/// The one restricted role the guard distinguishes.
pub const STAFF_ROLE: &str = "staff";

/// Session
///
/// The session assertion the guard decides on. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub role: String,
}

impl Session {
    /// Builds the assertion from the raw `vico_auth` / `vico_role` cookie values.
    /// A missing role falls back to `admin`.
    pub fn from_cookie_values(auth: Option<&str>, role: Option<&str>) -> Self {
        Self {
            authenticated: auth == Some(AUTHENTICATED),
            role: role.unwrap_or(DEFAULT_ROLE).to_string(),
        }
    }

    pub fn anonymous() -> Self {
        Self::from_cookie_values(None, None)
    }

    pub fn is_staff(&self) -> bool {
        self.role == STAFF_ROLE
    }
}

/// SessionMode
///
/// `Cookie` trusts the two plain cookies as-is. `Token` requires a signed, unexpired
/// session token and derives the same `(authenticated, role)` pair from its claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Cookie,
    Token,
}

impl FromStr for SessionMode {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cookie" | "" => Ok(SessionMode::Cookie),
            "token" => Ok(SessionMode::Token),
            other => Err(ConfigError::UnknownSessionMode(other.to_string())),
        }
    }
}

/// Claims
///
/// Payload of the signed session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: who the external login flow signed in.
    pub sub: String,
    /// Role label; absent behaves exactly like a missing `vico_role` cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(subject: impl Into<String>, role: Option<&str>, ttl: Duration) -> Self {
        let now = Utc::now().timestamp().max(0) as usize;
        Self {
            sub: subject.into(),
            role: role.map(str::to_string),
            iat: now,
            exp: now.saturating_add(usize::try_from(ttl.as_secs()).unwrap_or(usize::MAX)),
        }
    }
}

/// Signs `claims` with HS256. Used by the external login flow and by tests.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies signature and expiry. Any failure yields `None`; callers treat that as
/// "not signed in" rather than as an error.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            None
        }
    }
}

/// SessionResolver
///
/// Turns request cookies into a `Session`. Cheap to clone; handed to the guard
/// middleware as its state.
#[derive(Clone)]
pub struct SessionResolver {
    mode: SessionMode,
    secret: String,
}

impl SessionResolver {
    pub fn new(mode: SessionMode, secret: impl Into<String>) -> Self {
        Self {
            mode,
            secret: secret.into(),
        }
    }

    pub fn cookie() -> Self {
        Self::new(SessionMode::Cookie, String::new())
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn resolve(&self, cookies: &Cookies) -> Session {
        match self.mode {
            SessionMode::Cookie => {
                let auth = cookies.get(AUTH_COOKIE);
                let role = cookies.get(ROLE_COOKIE);
                Session::from_cookie_values(
                    auth.as_ref().map(|c| c.value()),
                    role.as_ref().map(|c| c.value()),
                )
            }
            SessionMode::Token => {
                let token = cookies.get(SESSION_COOKIE);
                self.resolve_token(token.as_ref().map(|c| c.value()))
            }
        }
    }

    /// Token-mode resolution over the raw cookie value.
    pub fn resolve_token(&self, token: Option<&str>) -> Session {
        match token.and_then(|t| verify_token(t, &self.secret)) {
            Some(claims) => Session::from_cookie_values(Some(AUTHENTICATED), claims.role.as_deref()),
            None => Session::anonymous(),
        }
    }
}
