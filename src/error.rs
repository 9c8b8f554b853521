//! Error taxonomy shared by rule compilation and pipeline execution.
//!
//! # Responsibilities
//! - Configuration errors (raised while compiling rules, never at request time)
//! - Mechanism creation errors (prototype lookup or overlay reconfiguration failed)
//! - Runtime errors produced by mechanisms and passed through the pipeline unchanged

use std::fmt;

use thiserror::Error;

/// The pluggable step kinds a rule pipeline is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MechanismKind {
    Authenticator,
    Authorizer,
    Contextualizer,
    Unifier,
    ErrorHandler,
}

impl MechanismKind {
    /// Key naming this kind in a pipeline step definition.
    pub fn as_str(&self) -> &'static str {
        match self {
            MechanismKind::Authenticator => "authenticator",
            MechanismKind::Authorizer => "authorizer",
            MechanismKind::Contextualizer => "contextualizer",
            MechanismKind::Unifier => "unifier",
            MechanismKind::ErrorHandler => "error_handler",
        }
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while compiling or executing rules.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or contradictory rule or pipeline definition.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mechanism could not be instantiated from its prototype.
    #[error("failed to create {kind}")]
    MechanismCreation {
        kind: MechanismKind,
        #[source]
        source: Box<Error>,
    },

    /// No prototype registered under the given id.
    #[error("no {kind} prototype with id '{id}' defined")]
    NoSuchMechanism { kind: MechanismKind, id: String },

    /// The mechanism pool references an unknown implementation type.
    #[error("unsupported {kind} type '{mechanism_type}'")]
    UnsupportedMechanismType {
        kind: MechanismKind,
        mechanism_type: String,
    },

    /// The request could not be authenticated.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The subject is not allowed to perform the request.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// A contextualizer could not obtain additional subject data.
    #[error("communication error: {0}")]
    Communication(String),

    /// An expression failed to evaluate at request time.
    #[error("expression evaluation failed: {0}")]
    ExpressionEvaluation(String),

    /// An error handler turned the failure into a redirect.
    #[error("redirect to {to}")]
    Redirect { to: url::Url, code: u16 },

    /// No rule matches the request.
    #[error("no rule found for {0}")]
    NoRuleFound(String),

    /// A rule matches the URL, but not the request method.
    #[error("method {method} not allowed for {url}")]
    MethodNotAllowed { method: String, url: String },

    /// The inbound request cannot be described (missing host, bad URI).
    #[error("invalid request: {0}")]
    Argument(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for [`Error::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Wraps a cause into a mechanism creation error for the given kind.
    pub fn mechanism_creation(kind: MechanismKind, cause: Error) -> Self {
        Error::MechanismCreation {
            kind,
            source: Box::new(cause),
        }
    }

    /// Returns true for errors raised because of malformed configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Result type for rule compilation and execution.
pub type Result<T> = std::result::Result<T, Error>;
