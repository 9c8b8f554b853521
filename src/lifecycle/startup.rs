//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the mechanism prototypes, the rule factory and all rules from a
//!   validated configuration
//! - Load rule set files and enforce unique rule ids across all sources
//! - Rebuild everything on reload and swap it in atomically
//!
//! # Design Decisions
//! - Fail fast: any build error is fatal at startup
//! - A failed reload keeps the active gateway untouched
//! - No partial updates: a reload always produces a complete new gateway

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, OperationMode, RuleConfig};
use crate::config::{load_config, load_rule_set, ConfigError};
use crate::error::Error;
use crate::mechanisms::PrototypeMechanismFactory;
use crate::routing::RuleRouter;
use crate::rules::{Rule, RuleFactory};

/// Source id of rules defined inline in the main configuration.
pub const CONFIG_SRC_ID: &str = "config";

/// Errors preventing a gateway from being built.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build rules: {0}")]
    Rules(#[from] Error),
}

/// Everything compiled from one configuration generation.
#[derive(Debug)]
pub struct Gateway {
    mode: OperationMode,
    router: RuleRouter,
}

impl Gateway {
    /// Compile a configuration into a ready-to-serve gateway.
    pub fn build(config: &GatewayConfig) -> Result<Self, StartupError> {
        let mechanisms = Arc::new(PrototypeMechanismFactory::new(&config.mechanisms)?);
        let factory = RuleFactory::new(mechanisms, config.default_rule.as_ref(), config.serve.mode)?;

        let mut rules = Vec::new();
        let mut ids = HashSet::new();

        add_rules(&factory, CONFIG_SRC_ID, CONFIG_SRC_ID, &config.rules, &mut ids, &mut rules)?;

        for path in &config.rule_sets {
            let rule_set = load_rule_set(path)?;
            let src_id = format!("file_system:{}", path.display());
            let rule_set_src_id = if rule_set.name.is_empty() {
                src_id.clone()
            } else {
                rule_set.name.clone()
            };

            add_rules(&factory, &src_id, &rule_set_src_id, &rule_set.rules, &mut ids, &mut rules)?;
            tracing::info!(
                path = %path.display(),
                version = %rule_set.version,
                rules = rule_set.rules.len(),
                "Rule set loaded"
            );
        }

        tracing::info!(
            rules = rules.len(),
            default_rule = factory.default_rule().is_some(),
            mode = ?config.serve.mode,
            "Rules compiled"
        );

        Ok(Self::new(
            config.serve.mode,
            RuleRouter::new(rules, factory.default_rule()),
        ))
    }

    /// Assemble a gateway from an already compiled router.
    pub fn new(mode: OperationMode, router: RuleRouter) -> Self {
        Self { mode, router }
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn router(&self) -> &RuleRouter {
        &self.router
    }
}

fn add_rules(
    factory: &RuleFactory,
    src_id: &str,
    rule_set_src_id: &str,
    configs: &[RuleConfig],
    ids: &mut HashSet<String>,
    rules: &mut Vec<Arc<Rule>>,
) -> Result<(), Error> {
    for config in configs {
        let rule = factory.create_rule(src_id, rule_set_src_id, config)?;

        if !ids.insert(rule.id().to_owned()) {
            return Err(Error::configuration(format!(
                "duplicate rule id '{}' in {src_id}",
                rule.id()
            )));
        }
        rules.push(Arc::new(rule));
    }

    Ok(())
}

/// Load the configuration at `path`, rebuild the gateway and swap it in.
///
/// On failure the active gateway stays in place and the error is returned.
pub fn reload(active: &ArcSwap<Gateway>, path: &Path) -> Result<GatewayConfig, StartupError> {
    let config = load_config(path)?;
    let gateway = Gateway::build(&config)?;

    active.store(Arc::new(gateway));
    tracing::info!(path = %path.display(), "Configuration reloaded");
    Ok(config)
}
