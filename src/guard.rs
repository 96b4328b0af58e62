//! Route access guard.
//!
//! Every page request that is not an API call or a static asset passes through
//! `route_guard`, which either lets it continue or redirects it. The decision itself
//! is the pure function `decide`; the middleware only gathers its inputs.

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::{CookieManagerLayer, Cookies};

use crate::auth::{Session, SessionResolver};

pub const API_PREFIX: &str = "/api/";
pub const LOGIN_PATH: &str = "/login";
pub const ROOT_PATH: &str = "/";
pub const COMMISSION_PATH: &str = "/commission";

/// Routes a staff session may visit. Matched exactly or as a `entry + "/"` prefix.
pub const STAFF_ALLOW_LIST: [&str; 2] = [COMMISSION_PATH, LOGIN_PATH];

/// Path prefixes the guard is never wired in front of, besides `/api/`.
const EXCLUDED_PREFIXES: [&str; 3] = [API_PREFIX, "/_next/static/", "/_next/image"];
const EXCLUDED_EXTENSIONS: [&str; 6] = [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// RouteClass
///
/// Classification of a request path. Depends only on the path and the fixed allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Api,
    Login,
    StaffAllowed,
    Protected,
}

impl RouteClass {
    pub fn of(path: &str) -> Self {
        if path.starts_with(API_PREFIX) {
            RouteClass::Api
        } else if path == LOGIN_PATH {
            RouteClass::Login
        } else if is_staff_allowed(path) {
            RouteClass::StaffAllowed
        } else {
            RouteClass::Protected
        }
    }
}

fn is_staff_allowed(path: &str) -> bool {
    STAFF_ALLOW_LIST.iter().any(|entry| {
        path == *entry
            || path
                .strip_prefix(entry)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Decision
///
/// The four possible outcomes of the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    RedirectToLogin,
    RedirectToRoot,
    RedirectToCommission,
}

impl Decision {
    /// Redirect target, `None` for `Continue`.
    pub fn location(self) -> Option<&'static str> {
        match self {
            Decision::Continue => None,
            Decision::RedirectToLogin => Some(LOGIN_PATH),
            Decision::RedirectToRoot => Some(ROOT_PATH),
            Decision::RedirectToCommission => Some(COMMISSION_PATH),
        }
    }
}

/// Applies the guard's rules in order; the first match wins.
pub fn decide(route: RouteClass, session: &Session) -> Decision {
    if route == RouteClass::Api {
        return Decision::Continue;
    }

    let on_login = route == RouteClass::Login;

    if session.authenticated && on_login {
        return if session.is_staff() {
            Decision::RedirectToCommission
        } else {
            Decision::RedirectToRoot
        };
    }

    if !session.authenticated && !on_login {
        return Decision::RedirectToLogin;
    }

    // Login and StaffAllowed are both on the allow-list.
    if session.authenticated && session.is_staff() && route == RouteClass::Protected {
        return Decision::RedirectToCommission;
    }

    Decision::Continue
}

/// Convenience over `decide` for a raw path.
pub fn evaluate(path: &str, session: &Session) -> Decision {
    decide(RouteClass::of(path), session)
}

/// True for paths the guard is not wired in front of: API routes, framework-internal
/// asset paths, the favicon and common image files.
pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || path == "/favicon.ico"
        || EXCLUDED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// route_guard
///
/// Middleware form of the guard. Reads cookies through `tower_cookies` and never
/// writes them.
pub async fn route_guard(
    State(resolver): State<SessionResolver>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if is_excluded(path) {
        return next.run(request).await;
    }

    let session = resolver.resolve(&cookies);
    match evaluate(path, &session).location() {
        None => next.run(request).await,
        Some(target) => {
            tracing::debug!(
                path,
                target,
                authenticated = session.authenticated,
                role = %session.role,
                "route guard redirect"
            );
            Redirect::temporary(target).into_response()
        }
    }
}

/// Wraps `router` with the guard. The cookie manager sits outside so `Cookies` is
/// available to the middleware.
pub fn with_route_guard(router: Router, resolver: SessionResolver) -> Router {
    router
        .layer(middleware::from_fn_with_state(resolver, route_guard))
        .layer(CookieManagerLayer::new())
}
