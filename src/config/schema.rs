//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mechanisms::MechanismConfig;

/// Root configuration for the access gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and operation mode.
    pub serve: ServeConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Mechanism prototypes referenced by rules.
    pub mechanisms: MechanismsConfig,

    /// Fallback rule used when no other rule matches.
    pub default_rule: Option<DefaultRuleConfig>,

    /// Rules defined inline.
    pub rules: Vec<RuleConfig>,

    /// Rule set files loaded in addition to inline rules.
    pub rule_sets: Vec<PathBuf>,
}

/// How the gateway answers requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Answer with an allow/deny decision only.
    #[default]
    Decision,
    /// Additionally compute the upstream URL; every rule needs `forward_to`.
    Proxy,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Bind address (e.g., "0.0.0.0:4456").
    pub bind_address: String,

    pub mode: OperationMode,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4456".to_string(),
            mode: OperationMode::Decision,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Prototype definitions, one list per mechanism kind.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MechanismsConfig {
    pub authenticators: Vec<MechanismDefinition>,
    pub authorizers: Vec<MechanismDefinition>,
    pub contextualizers: Vec<MechanismDefinition>,
    pub unifiers: Vec<MechanismDefinition>,
    pub error_handlers: Vec<MechanismDefinition>,
}

/// A single mechanism prototype.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MechanismDefinition {
    pub id: String,

    /// Implementation type, e.g. `anonymous` or `cel`.
    #[serde(rename = "type")]
    pub mechanism_type: String,

    pub config: Option<MechanismConfig>,
}

/// The default rule. It has no id and no matcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DefaultRuleConfig {
    pub methods: Vec<String>,
    pub execute: Vec<MechanismConfig>,
    pub on_error: Vec<MechanismConfig>,
}

/// A rule definition.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuleConfig {
    pub id: String,

    #[serde(rename = "match")]
    pub matcher: MatcherConfig,

    /// Upstream definition, mandatory in proxy mode.
    pub forward_to: Option<UpstreamConfig>,

    /// Allowed methods. Empty means inherited from the default rule.
    pub methods: Vec<String>,

    /// Execution pipeline. Empty means inherited from the default rule.
    pub execute: Vec<MechanismConfig>,

    /// Error pipeline. Empty means inherited from the default rule.
    pub on_error: Vec<MechanismConfig>,
}

/// URL matching definition of a rule.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MatcherConfig {
    pub url: String,

    /// `glob` or `regex`. Missing means `glob`.
    pub strategy: Option<String>,
}

/// Where matching requests are forwarded to.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream authority, `host[:port]`.
    pub host: String,

    pub rewrite: Option<RewriteConfig>,
}

/// URL rewrite applied when forwarding.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RewriteConfig {
    pub scheme: Option<String>,
    pub strip_path_prefix: Option<String>,
    pub add_path_prefix: Option<String>,
    pub strip_query_parameters: Option<Vec<String>>,
}

impl RewriteConfig {
    /// True when no rewrite option carries a value.
    pub fn is_empty(&self) -> bool {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, str::is_empty)
        }

        blank(&self.scheme)
            && blank(&self.strip_path_prefix)
            && blank(&self.add_path_prefix)
            && self
                .strip_query_parameters
                .as_ref()
                .map_or(true, Vec::is_empty)
    }
}

/// A rule set file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuleSetConfig {
    pub version: String,
    pub name: String,
    pub rules: Vec<RuleConfig>,
}
