//! Ordered mechanism sequences executed as one pipeline stage.
//!
//! # Responsibilities
//! - Subject creation: run the authenticator, failing if none is configured
//! - Subject handling: run contextualizers/authorizers (or unifiers) in order,
//!   skipping steps whose condition is false, stopping at the first failure
//! - Error handling: offer the error to each handler in order until one claims it

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    Authenticator, Authorizer, Contextualizer, ErrorHandler, ErrorHandling, Unifier,
};
use crate::pipeline::condition::ExecutionCondition;
use crate::pipeline::context::RequestContext;
use crate::pipeline::subject::Subject;

/// A mechanism together with its execution condition.
#[derive(Debug, Clone)]
pub struct Step<M> {
    pub mechanism: M,
    pub condition: ExecutionCondition,
}

impl<M> Step<M> {
    pub fn new(mechanism: M, condition: ExecutionCondition) -> Self {
        Self {
            mechanism,
            condition,
        }
    }

    pub fn unconditional(mechanism: M) -> Self {
        Self::new(mechanism, ExecutionCondition::Always)
    }
}

/// Mechanisms operating on an existing subject.
#[derive(Debug, Clone)]
pub enum SubjectHandler {
    Contextualizer(Arc<dyn Contextualizer>),
    Authorizer(Arc<dyn Authorizer>),
    Unifier(Arc<dyn Unifier>),
}

impl SubjectHandler {
    pub fn id(&self) -> &str {
        match self {
            SubjectHandler::Contextualizer(m) => m.id(),
            SubjectHandler::Authorizer(m) => m.id(),
            SubjectHandler::Unifier(m) => m.id(),
        }
    }

    pub fn kind(&self) -> MechanismKind {
        match self {
            SubjectHandler::Contextualizer(_) => MechanismKind::Contextualizer,
            SubjectHandler::Authorizer(_) => MechanismKind::Authorizer,
            SubjectHandler::Unifier(_) => MechanismKind::Unifier,
        }
    }

    async fn execute(&self, ctx: &mut RequestContext, subject: &mut Subject) -> Result<()> {
        match self {
            SubjectHandler::Contextualizer(m) => m.contextualize(ctx, subject).await,
            SubjectHandler::Authorizer(m) => m.authorize(ctx, subject).await,
            SubjectHandler::Unifier(m) => m.unify(ctx, subject).await,
        }
    }
}

/// Produces the subject of a request.
#[derive(Debug, Clone, Default)]
pub struct CompositeSubjectCreator {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl CompositeSubjectCreator {
    pub fn new(authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { authenticators }
    }

    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    /// Returns the subject of the first authenticator that succeeds.
    pub async fn execute(&self, ctx: &RequestContext) -> Result<Subject> {
        let mut last_error = None;

        for authenticator in &self.authenticators {
            debug!(authenticator = authenticator.id(), "Executing authenticator");
            match authenticator.authenticate(ctx).await {
                Ok(subject) => return Ok(subject),
                Err(err) => {
                    debug!(authenticator = authenticator.id(), error = %err, "Authenticator failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Internal("no authenticator configured".into())))
    }
}

/// Runs subject handlers in order.
#[derive(Debug, Clone, Default)]
pub struct CompositeSubjectHandler {
    steps: Vec<Step<SubjectHandler>>,
}

impl CompositeSubjectHandler {
    pub fn new(steps: Vec<Step<SubjectHandler>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step<SubjectHandler>] {
        &self.steps
    }

    pub async fn execute(&self, ctx: &mut RequestContext, subject: &mut Subject) -> Result<()> {
        for step in &self.steps {
            if !step.condition.evaluate(ctx, Some(&*subject))? {
                debug!(
                    kind = %step.mechanism.kind(),
                    id = step.mechanism.id(),
                    "Execution condition not met, skipping"
                );
                continue;
            }

            step.mechanism.execute(ctx, subject).await?;
        }

        Ok(())
    }
}

/// Maps a pipeline failure to its final outcome.
#[derive(Debug, Clone, Default)]
pub struct CompositeErrorHandler {
    steps: Vec<Step<Arc<dyn ErrorHandler>>>,
}

impl CompositeErrorHandler {
    pub fn new(steps: Vec<Step<Arc<dyn ErrorHandler>>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Offer the error to the handlers in order.
    ///
    /// Returns `Ok(())` if a handler absorbed the error. If no handler claims it,
    /// the original error is returned unchanged.
    pub async fn execute(&self, ctx: &mut RequestContext, error: Error) -> Result<()> {
        let mut error = error;

        for step in &self.steps {
            let handler = &step.mechanism;
            match step.condition.evaluate(ctx, ctx.subject()) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(eval_err) => {
                    warn!(
                        error_handler = handler.id(),
                        error = %eval_err,
                        cause = %error,
                        "Failed to evaluate error handler condition"
                    );
                    return Err(eval_err);
                }
            }

            match handler.handle_error(ctx, error).await {
                ErrorHandling::Handled(outcome) => {
                    debug!(error_handler = handler.id(), "Error handled");
                    return outcome.map_or(Ok(()), Err);
                }
                ErrorHandling::Declined(declined) => error = declined,
            }
        }

        Err(error)
    }
}
