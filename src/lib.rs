//! Access Gateway Library
//!
//! Rule construction and pipeline execution for an identity-aware access
//! decision service.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod mechanisms;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod rules;

pub use config::schema::GatewayConfig;
pub use error::{Error, MechanismKind, Result};
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
