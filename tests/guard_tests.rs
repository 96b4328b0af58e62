use vico_dashboard::{
    Session,
    guard::{Decision, RouteClass, decide, evaluate, is_excluded},
};

fn session(auth: Option<&str>, role: Option<&str>) -> Session {
    Session::from_cookie_values(auth, role)
}

fn staff() -> Session {
    session(Some("authenticated"), Some("staff"))
}

fn admin() -> Session {
    session(Some("authenticated"), None)
}

// --- Route classification ---

#[test]
fn test_route_classification() {
    assert_eq!(RouteClass::of("/api/products"), RouteClass::Api);
    assert_eq!(RouteClass::of("/api/"), RouteClass::Api);
    assert_eq!(RouteClass::of("/login"), RouteClass::Login);
    assert_eq!(RouteClass::of("/commission"), RouteClass::StaffAllowed);
    assert_eq!(RouteClass::of("/commission/details"), RouteClass::StaffAllowed);
    // Prefix match needs the separating slash.
    assert_eq!(RouteClass::of("/commissions"), RouteClass::Protected);
    assert_eq!(RouteClass::of("/login/help"), RouteClass::StaffAllowed);
    assert_eq!(RouteClass::of("/"), RouteClass::Protected);
    assert_eq!(RouteClass::of("/dashboard"), RouteClass::Protected);
    // "/api" without the trailing slash is an ordinary page path.
    assert_eq!(RouteClass::of("/api"), RouteClass::Protected);
}

// --- Decision table ---

#[test]
fn test_api_routes_always_continue() {
    let sessions = [
        session(None, None),
        session(Some("nope"), Some("staff")),
        staff(),
        admin(),
    ];
    for path in ["/api/", "/api/goals", "/api/tasks/123", "/api/login"] {
        for s in &sessions {
            assert_eq!(evaluate(path, s), Decision::Continue, "{path} with {s:?}");
        }
    }
}

#[test]
fn test_authenticated_staff_on_login_goes_to_commission() {
    assert_eq!(evaluate("/login", &staff()), Decision::RedirectToCommission);
}

#[test]
fn test_authenticated_admin_on_login_goes_to_root() {
    assert_eq!(evaluate("/login", &admin()), Decision::RedirectToRoot);
    let explicit = session(Some("authenticated"), Some("admin"));
    assert_eq!(evaluate("/login", &explicit), Decision::RedirectToRoot);
}

#[test]
fn test_unauthenticated_is_sent_to_login() {
    assert_eq!(
        evaluate("/dashboard", &session(None, None)),
        Decision::RedirectToLogin
    );
    // Only the exact value counts.
    for value in ["Authenticated", "true", "", "authenticated "] {
        assert_eq!(
            evaluate("/", &session(Some(value), None)),
            Decision::RedirectToLogin,
            "auth cookie {value:?}"
        );
    }
    // The staff allow-list does not help an anonymous visitor.
    assert_eq!(
        evaluate("/commission", &session(None, Some("staff"))),
        Decision::RedirectToLogin
    );
}

#[test]
fn test_unauthenticated_may_view_login() {
    assert_eq!(evaluate("/login", &session(None, None)), Decision::Continue);
    assert_eq!(
        evaluate("/login", &session(None, Some("staff"))),
        Decision::Continue
    );
}

#[test]
fn test_staff_prefix_match_continues() {
    assert_eq!(evaluate("/commission", &staff()), Decision::Continue);
    assert_eq!(evaluate("/commission/details", &staff()), Decision::Continue);
}

#[test]
fn test_staff_outside_allow_list_goes_to_commission() {
    for path in ["/settings", "/", "/commissions", "/goals/1"] {
        assert_eq!(evaluate(path, &staff()), Decision::RedirectToCommission, "{path}");
    }
}

#[test]
fn test_missing_role_defaults_to_admin() {
    let s = admin();
    assert_eq!(s.role, "admin");
    assert!(!s.is_staff());
    assert_eq!(evaluate("/anything", &s), Decision::Continue);
    assert_eq!(evaluate("/commission", &s), Decision::Continue);
}

#[test]
fn test_any_other_role_behaves_like_admin() {
    let s = session(Some("authenticated"), Some("Staff"));
    assert_eq!(evaluate("/settings", &s), Decision::Continue);
    assert_eq!(evaluate("/login", &s), Decision::RedirectToRoot);
}

#[test]
fn test_decision_is_idempotent() {
    for path in ["/", "/login", "/commission/x", "/settings", "/api/x"] {
        for s in [session(None, None), staff(), admin()] {
            let first = evaluate(path, &s);
            let second = evaluate(path, &s);
            assert_eq!(first, second);
            assert_eq!(first, decide(RouteClass::of(path), &s));
        }
    }
}

#[test]
fn test_redirect_locations() {
    assert_eq!(Decision::Continue.location(), None);
    assert_eq!(Decision::RedirectToLogin.location(), Some("/login"));
    assert_eq!(Decision::RedirectToRoot.location(), Some("/"));
    assert_eq!(Decision::RedirectToCommission.location(), Some("/commission"));
}

// --- Static matcher ---

#[test]
fn test_excluded_paths() {
    for path in [
        "/api/materials",
        "/_next/static/chunks/main.js",
        "/_next/image",
        "/_next/image/foo",
        "/favicon.ico",
        "/logo.svg",
        "/img/hero.png",
        "/a.jpg",
        "/a.jpeg",
        "/a.gif",
        "/deep/path/a.webp",
    ] {
        assert!(is_excluded(path), "{path} should skip the guard");
    }
}

#[test]
fn test_guarded_paths() {
    for path in [
        "/",
        "/login",
        "/commission",
        "/api",
        "/_next/data/x.json",
        "/report.pdf",
        "/photo.PNG",
        "/png",
    ] {
        assert!(!is_excluded(path), "{path} should be guarded");
    }
}
