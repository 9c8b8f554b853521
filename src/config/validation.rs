//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value formats (bind address, log level)
//! - Detect duplicate rule and mechanism ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Pipeline shape is not checked here; rule compilation owns that

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{GatewayConfig, MechanismDefinition, RuleConfig, RuleSetConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.serve.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "serve.bind_address",
            format!("'{}' is not a valid socket address", config.serve.bind_address),
        ));
    }

    // Plain levels only; directives like "access_gateway=debug" are accepted as is.
    let level = config.observability.log_level.as_str();
    if !level.contains('=') && !LOG_LEVELS.contains(&level) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown log level '{level}'"),
        ));
    }

    let mechanisms = &config.mechanisms;
    for (section, definitions) in [
        ("mechanisms.authenticators", &mechanisms.authenticators),
        ("mechanisms.authorizers", &mechanisms.authorizers),
        ("mechanisms.contextualizers", &mechanisms.contextualizers),
        ("mechanisms.unifiers", &mechanisms.unifiers),
        ("mechanisms.error_handlers", &mechanisms.error_handlers),
    ] {
        validate_definitions(section, definitions, &mut errors);
    }

    validate_rules("rules", &config.rules, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_rule_set(rule_set: &RuleSetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if rule_set.version.is_empty() {
        errors.push(ValidationError::new("version", "must not be empty"));
    }
    validate_rules("rules", &rule_set.rules, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_definitions(
    section: &str,
    definitions: &[MechanismDefinition],
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();

    for (idx, definition) in definitions.iter().enumerate() {
        if definition.id.is_empty() {
            errors.push(ValidationError::new(
                format!("{section}[{idx}].id"),
                "must not be empty",
            ));
        } else if !seen.insert(definition.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{section}[{idx}].id"),
                format!("duplicate id '{}'", definition.id),
            ));
        }

        if definition.mechanism_type.is_empty() {
            errors.push(ValidationError::new(
                format!("{section}[{idx}].type"),
                "must not be empty",
            ));
        }
    }
}

fn validate_rules(section: &str, rules: &[RuleConfig], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for (idx, rule) in rules.iter().enumerate() {
        if !rule.id.is_empty() && !seen.insert(rule.id.as_str()) {
            errors.push(ValidationError::new(
                format!("{section}[{idx}].id"),
                format!("duplicate rule id '{}'", rule.id),
            ));
        }
    }
}
