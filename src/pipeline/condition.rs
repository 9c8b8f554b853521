//! Execution conditions gating individual pipeline steps.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::pipeline::context::RequestContext;
use crate::pipeline::expression::Expression;
use crate::pipeline::subject::Subject;

/// Decides at request time whether a step runs.
#[derive(Debug, Clone, Default)]
pub enum ExecutionCondition {
    /// No `if` given: the step always runs.
    #[default]
    Always,
    Expression(Expression),
}

impl ExecutionCondition {
    /// Build from the optional `if` value of a step definition.
    ///
    /// Non-string values and empty strings are configuration errors.
    pub fn from_step_value(value: Option<&Value>) -> Result<Self> {
        let Some(value) = value else {
            return Ok(ExecutionCondition::Always);
        };

        let source = value.as_str().ok_or_else(|| {
            Error::configuration(format!(
                "unexpected type for execution condition, expected a string, got {value}"
            ))
        })?;

        if source.trim().is_empty() {
            return Err(Error::configuration("empty execution condition"));
        }

        Ok(ExecutionCondition::Expression(Expression::compile(source)?))
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, ExecutionCondition::Expression(_))
    }

    /// Evaluate the condition. Evaluation errors are returned, never treated as false.
    pub fn evaluate(&self, ctx: &RequestContext, subject: Option<&Subject>) -> Result<bool> {
        match self {
            ExecutionCondition::Always => Ok(true),
            ExecutionCondition::Expression(expr) => expr.evaluate_bool(ctx, subject),
        }
    }
}
