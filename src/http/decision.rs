//! Decision endpoint.
//!
//! # Responsibilities
//! - Reconstruct the original request from forwarding headers
//! - Find the responsible rule and execute its pipeline
//! - Answer 200 with the unifier headers, or the mapped error
//!
//! # Design Decisions
//! - `X-Forwarded-*` headers take precedence over the request line
//! - The active gateway is loaded once per request; a reload in flight does
//!   not affect requests already being processed

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::error::{Error, Result};
use crate::http::server::AppState;
use crate::pipeline::RequestContext;

pub const X_FORWARDED_METHOD: &str = "x-forwarded-method";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_URI: &str = "x-forwarded-uri";

/// Header carrying the computed upstream URL in proxy mode.
pub const X_UPSTREAM_URL: &str = "x-upstream-url";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Build the request context from the inbound request line and headers.
pub fn request_context(method: Method, uri: &Uri, headers: HeaderMap) -> Result<RequestContext> {
    let method = match header(&headers, X_FORWARDED_METHOD) {
        Some(value) => Method::from_bytes(value.as_bytes())
            .map_err(|_| Error::Argument(format!("invalid forwarded method '{value}'")))?,
        None => method,
    };

    let scheme = header(&headers, X_FORWARDED_PROTO)
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");

    let host = header(&headers, X_FORWARDED_HOST)
        .or_else(|| header(&headers, "host"))
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .ok_or_else(|| Error::Argument("cannot determine request host".into()))?;

    let path = header(&headers, X_FORWARDED_URI)
        .or_else(|| uri.path_and_query().map(|pq| pq.as_str()))
        .unwrap_or("/");

    let url = Url::parse(&format!("{scheme}://{host}{path}"))
        .map_err(|err| Error::Argument(format!("invalid request URL: {err}")))?;

    Ok(RequestContext::new(method, url, headers))
}

/// Handles every request as a decision request.
pub async fn decision_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let gateway = state.gateway.load_full();

    let mut ctx = match request_context(method, &uri, headers) {
        Ok(ctx) => ctx,
        Err(err) => return err.into_response(),
    };

    tracing::debug!(method = %ctx.method(), url = %ctx.url(), "Decision request");

    let rule = match gateway.router().find_rule(ctx.url(), ctx.method().as_str()) {
        Ok(rule) => rule,
        Err(err) => return err.into_response(),
    };

    let upstream = match rule.execute(&mut ctx).await {
        Ok(upstream) => upstream,
        Err(err) => return err.into_response(),
    };

    if let Some(err) = ctx.take_pipeline_error() {
        return err.into_response();
    }

    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    for (name, value) in ctx.upstream_headers() {
        headers.insert(name.clone(), value.clone());
    }

    if let Some(url) = upstream {
        match HeaderValue::from_str(url.as_str()) {
            Ok(value) => {
                headers.insert(X_UPSTREAM_URL, value);
            }
            Err(err) => {
                return Error::Internal(format!("invalid upstream URL '{url}': {err}"))
                    .into_response()
            }
        }
    }

    tracing::debug!(rule = rule.id(), "Request allowed");
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arc_swap::ArcSwap;
    use serde_json::json;

    use crate::config::schema::{MatcherConfig, OperationMode, RuleConfig};
    use crate::lifecycle::Gateway;
    use crate::mechanisms::testing::{entries, Behaviour, FakeFactory, Journal};
    use crate::routing::RuleRouter;
    use crate::rules::RuleFactory;

    #[test]
    fn test_context_from_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_METHOD, HeaderValue::from_static("POST"));
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
        headers.insert(X_FORWARDED_HOST, HeaderValue::from_static("foo.bar"));
        headers.insert(X_FORWARDED_URI, HeaderValue::from_static("/api?x=1"));
        headers.insert("host", HeaderValue::from_static("gateway:4456"));

        let uri: Uri = "/decisions".parse().unwrap();
        let ctx = request_context(Method::GET, &uri, headers).unwrap();

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.url().as_str(), "https://foo.bar/api?x=1");
    }

    #[test]
    fn test_context_from_request_line() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("foo.bar:8080"));

        let uri: Uri = "/items/1?limit=2".parse().unwrap();
        let ctx = request_context(Method::DELETE, &uri, headers).unwrap();

        assert_eq!(ctx.method(), Method::DELETE);
        assert_eq!(ctx.url().as_str(), "http://foo.bar:8080/items/1?limit=2");
    }

    #[test]
    fn test_context_without_host() {
        let uri: Uri = "/".parse().unwrap();
        assert!(matches!(
            request_context(Method::GET, &uri, HeaderMap::new()),
            Err(Error::Argument(_))
        ));
    }

    fn state_with_unifier(behaviour: Behaviour) -> (AppState, Journal) {
        let mechanisms = Arc::new(FakeFactory::new().with_behaviour("headers", behaviour));
        let journal = mechanisms.journal();
        let factory = RuleFactory::new(mechanisms, None, OperationMode::Decision).unwrap();

        let config = RuleConfig {
            id: "api".into(),
            matcher: MatcherConfig {
                url: "http://foo.bar/**".into(),
                strategy: None,
            },
            methods: vec!["GET".into()],
            execute: vec![
                json!({"authenticator": "anon"}).as_object().cloned().unwrap(),
                json!({"unifier": "headers"}).as_object().cloned().unwrap(),
            ],
            ..Default::default()
        };
        let rule = Arc::new(factory.create_rule("test", "test", &config).unwrap());
        let gateway = Gateway::new(OperationMode::Decision, RuleRouter::new(vec![rule], None));

        let state = AppState {
            gateway: Arc::new(ArcSwap::from_pointee(gateway)),
        };
        (state, journal)
    }

    fn host_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("foo.bar"));
        headers
    }

    #[tokio::test]
    async fn test_allowed_decision_returns_unifier_headers() {
        let (state, _) = state_with_unifier(Behaviour::Succeed);
        let response =
            decision_handler(State(state), Method::GET, "/x".parse().unwrap(), host_headers()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-subject").unwrap(), "anon");
    }

    #[tokio::test]
    async fn test_reported_pipeline_error_overrides_success() {
        let (state, journal) = state_with_unifier(Behaviour::Report);
        let response =
            decision_handler(State(state), Method::GET, "/x".parse().unwrap(), host_headers()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("x-subject").is_none());
        assert_eq!(
            entries(&journal),
            vec!["authenticator:anon", "unifier:headers"]
        );
    }
}
