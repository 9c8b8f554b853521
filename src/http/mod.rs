//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → decision.rs (request context from X-Forwarded-* headers)
//!     → [router picks rule, rule executes pipeline]
//!     → response.rs (status mapping, redirect Location)
//!     → Send to client
//! ```

pub mod decision;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
