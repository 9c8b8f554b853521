//! Rule construction from configuration.
//!
//! # Responsibilities
//! - Build the optional default rule once, at factory creation
//! - Compile rule definitions: proxy-mode checks, URL pattern, pipelines, methods
//! - Enforce the pipeline shape: one leading authenticator, contextualizers and
//!   authorizers before the first unifier, at least one unifier
//! - Inherit empty sections from the default rule
//!
//! # Design Decisions
//! - Step positions are checked before the step's mechanism is created
//! - `forward_to` is only evaluated in proxy mode; decision mode ignores it

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::schema::{DefaultRuleConfig, OperationMode, RuleConfig, UpstreamConfig};
use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{MechanismConfig, MechanismFactory};
use crate::pipeline::{
    CompositeErrorHandler, CompositeSubjectCreator, CompositeSubjectHandler, ExecutionCondition,
    Step, SubjectHandler,
};
use crate::routing::matcher::UrlMatcher;
use crate::rules::methods::expand_http_methods;
use crate::rules::rule::{ExecutePipeline, Rule};
use crate::rules::upstream::UpstreamUrlFactory;

const DEFAULT_RULE_ID: &str = "default";
const DEFAULT_RULE_SRC_ID: &str = "config";

const EXECUTE_KINDS: [MechanismKind; 4] = [
    MechanismKind::Authenticator,
    MechanismKind::Contextualizer,
    MechanismKind::Authorizer,
    MechanismKind::Unifier,
];

const ON_ERROR_KINDS: [MechanismKind; 1] = [MechanismKind::ErrorHandler];

/// Where the execute walk currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    ExpectAuthenticator,
    Handlers,
    Unifiers,
}

/// A parsed pipeline step: `{ <kind> = "<id>", config = {...}, if = "..." }`.
#[derive(Debug)]
struct StepDefinition<'a> {
    kind: MechanismKind,
    id: &'a str,
    config: Option<&'a MechanismConfig>,
    condition: Option<&'a Value>,
}

impl<'a> StepDefinition<'a> {
    fn parse(step: &'a MechanismConfig, allowed: &[MechanismKind], section: &str) -> Result<Self> {
        let mut reference = None;
        let mut config = None;
        let mut condition = None;

        for (key, value) in step {
            match key.as_str() {
                "if" => condition = Some(value),
                "config" => {
                    config = Some(value.as_object().ok_or_else(|| {
                        Error::configuration(format!(
                            "unexpected type for step configuration in {section}, expected a table"
                        ))
                    })?);
                }
                other => {
                    let kind = allowed
                        .iter()
                        .copied()
                        .find(|kind| kind.as_str() == other)
                        .ok_or_else(|| {
                            Error::configuration(format!(
                                "unsupported configuration in {section}: unknown step key '{other}'"
                            ))
                        })?;

                    if reference.is_some() {
                        return Err(Error::configuration(format!(
                            "unsupported configuration in {section}: a step references more than one mechanism"
                        )));
                    }

                    let id = value.as_str().filter(|id| !id.is_empty()).ok_or_else(|| {
                        Error::configuration(format!(
                            "unexpected type for {kind} reference in {section}, expected a non-empty string"
                        ))
                    })?;
                    reference = Some((kind, id));
                }
            }
        }

        let (kind, id) = reference.ok_or_else(|| {
            Error::configuration(format!(
                "unsupported configuration in {section}: step references no mechanism"
            ))
        })?;

        Ok(Self {
            kind,
            id,
            config,
            condition,
        })
    }
}

fn with_article(kind: MechanismKind) -> &'static str {
    match kind {
        MechanismKind::Authenticator => "an authenticator",
        MechanismKind::Authorizer => "an authorizer",
        MechanismKind::Contextualizer => "a contextualizer",
        MechanismKind::Unifier => "a unifier",
        MechanismKind::ErrorHandler => "an error handler",
    }
}

/// In proxy mode every rule needs a usable `forward_to`.
fn check_proxy_mode_applicability<'a>(
    rule_id: &str,
    forward_to: Option<&'a UpstreamConfig>,
) -> Result<&'a UpstreamConfig> {
    let upstream = forward_to.ok_or_else(|| {
        Error::configuration(format!(
            "no forward_to definition in rule '{rule_id}', which is required in proxy mode"
        ))
    })?;

    if upstream.host.is_empty() {
        return Err(Error::configuration(format!(
            "missing host definition in forward_to of rule '{rule_id}'"
        )));
    }

    if upstream.rewrite.as_ref().is_some_and(|r| r.is_empty()) {
        return Err(Error::configuration(format!(
            "rewrite is defined in forward_to of rule '{rule_id}', but is empty"
        )));
    }

    Ok(upstream)
}

fn ensure_complete(pipeline: &ExecutePipeline, rule_id: &str) -> Result<()> {
    if pipeline.sc.is_empty() {
        return Err(Error::configuration(format!(
            "no authenticator defined for rule '{rule_id}'"
        )));
    }

    if pipeline.un.is_empty() {
        return Err(Error::configuration(format!(
            "no unifier defined for rule '{rule_id}'"
        )));
    }

    Ok(())
}

/// Compiles rule definitions into executable [`Rule`]s.
pub struct RuleFactory {
    mechanisms: Arc<dyn MechanismFactory>,
    default_rule: Option<Arc<Rule>>,
    mode: OperationMode,
}

impl RuleFactory {
    /// Create a factory. A configured default rule is compiled right away.
    pub fn new(
        mechanisms: Arc<dyn MechanismFactory>,
        default_rule: Option<&DefaultRuleConfig>,
        mode: OperationMode,
    ) -> Result<Self> {
        let mut factory = Self {
            mechanisms,
            default_rule: None,
            mode,
        };

        match default_rule {
            Some(config) => {
                info!("Loading default rule");
                let rule = factory.create_default_rule(config).inspect_err(|err| {
                    error!(error = %err, "Failed loading default rule");
                })?;
                factory.default_rule = Some(Arc::new(rule));
            }
            None => info!("No default rule configured"),
        }

        Ok(factory)
    }

    /// The compiled default rule, if configured.
    pub fn default_rule(&self) -> Option<Arc<Rule>> {
        self.default_rule.clone()
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    /// Compile a rule.
    ///
    /// `src_id` is recorded on the rule and passed to mechanism creation,
    /// `rule_set_src_id` names the rule set the definition came from.
    pub fn create_rule(
        &self,
        src_id: &str,
        rule_set_src_id: &str,
        config: &RuleConfig,
    ) -> Result<Rule> {
        if config.id.is_empty() {
            return Err(Error::configuration(format!(
                "no ID defined for rule from rule set '{rule_set_src_id}'"
            )));
        }
        let rule_id = config.id.as_str();

        let upstream = match self.mode {
            OperationMode::Proxy => {
                let upstream = check_proxy_mode_applicability(rule_id, config.forward_to.as_ref())?;
                Some(UpstreamUrlFactory::new(upstream)?)
            }
            OperationMode::Decision => {
                if config.forward_to.is_some() {
                    warn!(rule = rule_id, "forward_to is ignored in decision mode");
                }
                None
            }
        };

        let url_matcher = UrlMatcher::new(&config.matcher.url, config.matcher.strategy.as_deref())
            .map_err(|err| Error::configuration(format!("rule '{rule_id}': {err}")))?;

        let execute = match (&self.default_rule, config.execute.is_empty()) {
            (Some(default), true) => default.execute.clone(),
            _ => self.build_execute_pipeline(src_id, rule_id, &config.execute)?,
        };

        let on_error = match (&self.default_rule, config.on_error.is_empty()) {
            (Some(default), true) => default.on_error.clone(),
            _ => Arc::new(self.build_error_pipeline(src_id, &config.on_error)?),
        };

        ensure_complete(&execute, rule_id)?;

        let methods = match (&self.default_rule, config.methods.is_empty()) {
            (Some(default), true) => default.methods.clone(),
            _ => expand_http_methods(&config.methods)?,
        };
        if methods.is_empty() {
            return Err(Error::configuration(format!(
                "no methods defined for rule '{rule_id}'"
            )));
        }

        debug!(
            rule = rule_id,
            src = src_id,
            rule_set = rule_set_src_id,
            "Rule created"
        );

        Ok(Rule {
            id: config.id.clone(),
            src_id: src_id.to_owned(),
            is_default: false,
            methods,
            url_matcher: Some(url_matcher),
            execute,
            on_error,
            upstream,
        })
    }

    fn create_default_rule(&self, config: &DefaultRuleConfig) -> Result<Rule> {
        let execute =
            self.build_execute_pipeline(DEFAULT_RULE_SRC_ID, DEFAULT_RULE_ID, &config.execute)?;
        let on_error = self.build_error_pipeline(DEFAULT_RULE_SRC_ID, &config.on_error)?;

        ensure_complete(&execute, DEFAULT_RULE_ID)?;

        let methods = expand_http_methods(&config.methods)?;
        if methods.is_empty() {
            return Err(Error::configuration("no methods defined for default rule"));
        }

        Ok(Rule {
            id: DEFAULT_RULE_ID.to_owned(),
            src_id: DEFAULT_RULE_SRC_ID.to_owned(),
            is_default: true,
            methods,
            url_matcher: None,
            execute,
            on_error: Arc::new(on_error),
            upstream: None,
        })
    }

    fn build_execute_pipeline(
        &self,
        src_id: &str,
        rule_id: &str,
        steps: &[MechanismConfig],
    ) -> Result<ExecutePipeline> {
        let mut position = Position::ExpectAuthenticator;
        let mut authenticators = Vec::new();
        let mut handlers = Vec::new();
        let mut unifiers = Vec::new();

        for step in steps {
            let step = StepDefinition::parse(step, &EXECUTE_KINDS, "execute")?;

            match step.kind {
                MechanismKind::Authenticator => {
                    if position != Position::ExpectAuthenticator {
                        return Err(Error::configuration(format!(
                            "rule '{rule_id}': an authenticator is only allowed as the first step of the execute pipeline"
                        )));
                    }
                    if step.condition.is_some() {
                        return Err(Error::configuration(format!(
                            "rule '{rule_id}': authenticator '{}' cannot be executed conditionally",
                            step.id
                        )));
                    }

                    authenticators.push(self.mechanisms.create_authenticator(
                        src_id,
                        step.id,
                        step.config,
                    )?);
                    position = Position::Handlers;
                }
                MechanismKind::Contextualizer | MechanismKind::Authorizer => {
                    if position == Position::Unifiers {
                        return Err(Error::configuration(format!(
                            "rule '{rule_id}': a unifier is configured before {}",
                            with_article(step.kind)
                        )));
                    }

                    let condition = ExecutionCondition::from_step_value(step.condition)?;
                    let handler = if step.kind == MechanismKind::Contextualizer {
                        SubjectHandler::Contextualizer(self.mechanisms.create_contextualizer(
                            src_id,
                            step.id,
                            step.config,
                        )?)
                    } else {
                        SubjectHandler::Authorizer(self.mechanisms.create_authorizer(
                            src_id,
                            step.id,
                            step.config,
                        )?)
                    };

                    handlers.push(Step::new(handler, condition));
                    position = Position::Handlers;
                }
                MechanismKind::Unifier => {
                    let condition = ExecutionCondition::from_step_value(step.condition)?;
                    let unifier = self
                        .mechanisms
                        .create_unifier(src_id, step.id, step.config)?;

                    unifiers.push(Step::new(SubjectHandler::Unifier(unifier), condition));
                    position = Position::Unifiers;
                }
                MechanismKind::ErrorHandler => {
                    return Err(Error::configuration(
                        "unsupported configuration in execute: error handlers belong to on_error",
                    ));
                }
            }
        }

        Ok(ExecutePipeline {
            sc: Arc::new(CompositeSubjectCreator::new(authenticators)),
            sh: Arc::new(CompositeSubjectHandler::new(handlers)),
            un: Arc::new(CompositeSubjectHandler::new(unifiers)),
        })
    }

    fn build_error_pipeline(
        &self,
        src_id: &str,
        steps: &[MechanismConfig],
    ) -> Result<CompositeErrorHandler> {
        let mut handlers = Vec::with_capacity(steps.len());

        for step in steps {
            let step = StepDefinition::parse(step, &ON_ERROR_KINDS, "on_error")?;
            let condition = ExecutionCondition::from_step_value(step.condition)?;
            let handler = self
                .mechanisms
                .create_error_handler(src_id, step.id, step.config)?;

            handlers.push(Step::new(handler, condition));
        }

        Ok(CompositeErrorHandler::new(handlers))
    }
}
