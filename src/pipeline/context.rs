//! Per-request state handed to mechanisms.
//!
//! # Responsibilities
//! - Read access to the inbound method, URL and headers
//! - Hold the subject once the authenticator has created it
//! - Collect headers for the upstream/decision response
//! - Act as error sink for mechanisms reporting a pipeline error out of band

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method};
use url::Url;

use crate::error::{Error, Result};
use crate::pipeline::subject::Subject;

/// Context of a single request. Owned by the request, never shared.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    url: Url,
    headers: HeaderMap,
    subject: Option<Subject>,
    upstream_headers: HeaderMap,
    pipeline_error: Option<Error>,
}

impl RequestContext {
    /// Create a context for the given request description.
    pub fn new(method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            headers,
            subject: None,
            upstream_headers: HeaderMap::new(),
            pipeline_error: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of a request header, if present and valid UTF-8.
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Subject of the request, available after successful authentication.
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub(crate) fn set_subject(&mut self, subject: Subject) {
        self.subject = Some(subject);
    }

    /// Add a header to be sent upstream (or returned by the decision service).
    pub fn add_upstream_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::Internal(format!("invalid header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| Error::Internal(format!("invalid value for header '{name}': {err}")))?;
        self.upstream_headers.insert(name, value);
        Ok(())
    }

    pub fn upstream_headers(&self) -> &HeaderMap {
        &self.upstream_headers
    }

    /// Record an error to be reported instead of a positive decision.
    ///
    /// For mechanisms that must deny the request without failing their step,
    /// e.g. to let the remaining unifiers run first. The decision endpoint
    /// checks this sink after the rule executed successfully.
    pub fn set_pipeline_error(&mut self, error: Error) {
        self.pipeline_error = Some(error);
    }

    pub fn take_pipeline_error(&mut self) -> Option<Error> {
        self.pipeline_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_static("alice"));
        RequestContext::new(
            Method::GET,
            Url::parse("http://foo.bar/baz").unwrap(),
            headers,
        )
    }

    #[test]
    fn test_request_header_lookup() {
        let ctx = context();
        assert_eq!(ctx.request_header("X-User"), Some("alice"));
        assert_eq!(ctx.request_header("X-Other"), None);
    }

    #[test]
    fn test_upstream_headers() {
        let mut ctx = context();
        ctx.add_upstream_header("X-Subject", "alice").unwrap();
        assert_eq!(ctx.upstream_headers().get("x-subject").unwrap(), "alice");

        assert!(ctx.add_upstream_header("bad header", "x").is_err());
    }

    #[test]
    fn test_pipeline_error_sink() {
        let mut ctx = context();
        assert!(ctx.take_pipeline_error().is_none());

        ctx.set_pipeline_error(Error::Authorization("nope".into()));
        assert!(matches!(ctx.take_pipeline_error(), Some(Error::Authorization(_))));
        assert!(ctx.take_pipeline_error().is_none());
    }
}
