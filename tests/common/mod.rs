//! Shared utilities for integration testing.

use std::sync::Arc;

use access_gateway::config::loader::parse_config;
use access_gateway::http::{AppState, HttpServer};
use access_gateway::Gateway;
use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;

/// Mechanism catalogue shared by most tests.
pub const MECHANISMS: &str = r#"
    [[mechanisms.authenticators]]
    id = "anon"
    type = "anonymous"

    [[mechanisms.authenticators]]
    id = "user_header"
    type = "header"
    config = { header = "X-User" }

    [[mechanisms.authorizers]]
    id = "allow"
    type = "allow"

    [[mechanisms.authorizers]]
    id = "deny"
    type = "deny"

    [[mechanisms.authorizers]]
    id = "admins_only"
    type = "cel"
    config = { expressions = [{ expression = "Subject.ID == 'admin'", message = "admin required" }] }

    [[mechanisms.contextualizers]]
    id = "tenant"
    type = "static"
    config = { attributes = { tenant = "acme" } }

    [[mechanisms.unifiers]]
    id = "noop"
    type = "noop"

    [[mechanisms.unifiers]]
    id = "subject_headers"
    type = "header"
    config = { headers = { "X-User-Id" = "Subject.ID" } }

    [[mechanisms.error_handlers]]
    id = "default"
    type = "default"

    [[mechanisms.error_handlers]]
    id = "login"
    type = "redirect"
    config = { to = "https://login.foo.bar/", code = 302 }
"#;

/// Build a router serving a gateway compiled from the given TOML (appended to [`MECHANISMS`]).
pub fn router(rules: &str) -> Router {
    let config = parse_config(&format!("{MECHANISMS}\n{rules}")).unwrap();
    let gateway = Gateway::build(&config).unwrap();
    HttpServer::build_router(AppState {
        gateway: Arc::new(ArcSwap::from_pointee(gateway)),
    })
}

/// Send a decision request for `method url`, using the forwarding headers.
pub async fn decide(router: &Router, method: &str, url: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let url = url::Url::parse(url).unwrap();
    let host = match url.port() {
        Some(port) => format!("{}:{port}", url.host_str().unwrap()),
        None => url.host_str().unwrap().to_owned(),
    };
    let uri = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    };

    let mut request = Request::builder()
        .method("GET")
        .uri("/decisions")
        .header("host", "gateway:4456")
        .header("x-forwarded-method", method)
        .header("x-forwarded-proto", url.scheme())
        .header("x-forwarded-host", host)
        .header("x-forwarded-uri", uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Value of a response header as a string.
pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
