//! Pluggable mechanisms a rule pipeline is composed of.
//!
//! # Responsibilities
//! - Define the capability traits for the five mechanism kinds
//! - Provide the built-in implementations referenced by `type` in the configuration
//! - Keep a repository of configured prototypes and derive per-rule variants from it
//!
//! # Design Decisions
//! - Prototypes are immutable. A rule-level overlay produces a new instance via
//!   `with_config`, the prototype itself is never modified.
//! - No overlay means the prototype instance is shared as is.
//! - Mechanism configuration stays a JSON map until a concrete mechanism decodes it.

pub mod authenticators;
pub mod authorizers;
pub mod contextualizers;
pub mod error_handlers;
pub mod factory;
pub mod prototypes;
pub mod unifiers;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, MechanismKind, Result};
use crate::pipeline::{RequestContext, Subject};

pub use factory::{MechanismFactory, PrototypeMechanismFactory};
pub use prototypes::PrototypeRepository;

/// Raw configuration of a mechanism, or of a pipeline step.
pub type MechanismConfig = Map<String, Value>;

/// Creates the subject of a request.
#[async_trait]
pub trait Authenticator: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    /// Derive a new instance with the overlay applied.
    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authenticator>>;

    async fn authenticate(&self, ctx: &RequestContext) -> Result<Subject>;
}

/// Decides whether the subject may perform the request.
#[async_trait]
pub trait Authorizer: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authorizer>>;

    async fn authorize(&self, ctx: &RequestContext, subject: &Subject) -> Result<()>;
}

/// Enriches the subject with additional attributes.
#[async_trait]
pub trait Contextualizer: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Contextualizer>>;

    async fn contextualize(&self, ctx: &RequestContext, subject: &mut Subject) -> Result<()>;
}

/// Transforms the subject into what the upstream expects.
#[async_trait]
pub trait Unifier: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Unifier>>;

    async fn unify(&self, ctx: &mut RequestContext, subject: &Subject) -> Result<()>;
}

/// Outcome of offering an error to an error handler.
#[derive(Debug)]
pub enum ErrorHandling {
    /// The handler is not responsible; the error is passed on unchanged.
    Declined(Error),
    /// The handler claimed the error. `None` means it was fully absorbed.
    Handled(Option<Error>),
}

/// Maps a pipeline failure to the response sent to the client.
#[async_trait]
pub trait ErrorHandler: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn ErrorHandler>>;

    async fn handle_error(&self, ctx: &mut RequestContext, error: Error) -> ErrorHandling;
}

/// Decode a mechanism configuration into its typed form.
pub(crate) fn decode_config<T: DeserializeOwned>(
    kind: MechanismKind,
    id: &str,
    config: &MechanismConfig,
) -> Result<T> {
    serde_json::from_value(Value::Object(config.clone())).map_err(|err| {
        Error::configuration(format!("invalid configuration for {kind} '{id}': {err}"))
    })
}

/// Decode an optional prototype configuration, falling back to defaults.
pub(crate) fn decode_optional_config<T: DeserializeOwned + Default>(
    kind: MechanismKind,
    id: &str,
    config: Option<&MechanismConfig>,
) -> Result<T> {
    match config {
        Some(config) => decode_config(kind, id, config),
        None => Ok(T::default()),
    }
}

/// Fail unless the configuration is empty. Used by mechanisms without settings.
pub(crate) fn reject_config(
    kind: MechanismKind,
    id: &str,
    config: Option<&MechanismConfig>,
) -> Result<()> {
    match config {
        Some(config) if !config.is_empty() => Err(Error::configuration(format!(
            "{kind} '{id}' has no configurable settings, got {}",
            config.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn unsupported_type(kind: MechanismKind, mechanism_type: &str) -> Error {
    Error::UnsupportedMechanismType {
        kind,
        mechanism_type: mechanism_type.to_owned(),
    }
}
