//! Response mapping for pipeline outcomes.
//!
//! # Responsibilities
//! - Map pipeline and routing errors to HTTP status codes
//! - Turn redirect outcomes into `Location` responses
//!
//! # Design Decisions
//! - Error details are logged, never sent to the client
//! - Everything not explicitly mapped is a 500

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::Error;

/// Status code a pipeline error is answered with.
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Authentication(_) => StatusCode::UNAUTHORIZED,
        Error::Authorization(_) => StatusCode::FORBIDDEN,
        Error::Redirect { code, .. } => StatusCode::from_u16(*code).unwrap_or(StatusCode::FOUND),
        Error::NoRuleFound(_) => StatusCode::NOT_FOUND,
        Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        Error::Argument(_) => StatusCode::BAD_REQUEST,
        Error::Communication(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut response = (status, status.canonical_reason().unwrap_or_default()).into_response();

        if let Error::Redirect { to, .. } = &self {
            if let Ok(location) = HeaderValue::from_str(to.as_str()) {
                response.headers_mut().insert(header::LOCATION, location);
            }
        }

        response
    }
}
