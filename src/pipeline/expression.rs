//! CEL expressions over the request and subject.
//!
//! Expressions see two variables:
//! - `Request` with `Method`, `URL` (`Scheme`, `Host`, `Path`, `Query`) and `Headers`
//! - `Subject` with `ID` and `Attributes`, or `null` before authentication

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cel_interpreter::{Context, Program, Value};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::pipeline::context::RequestContext;
use crate::pipeline::subject::Subject;

#[derive(Serialize)]
struct RequestView<'a> {
    #[serde(rename = "Method")]
    method: &'a str,
    #[serde(rename = "URL")]
    url: UrlView<'a>,
    #[serde(rename = "Headers")]
    headers: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct UrlView<'a> {
    #[serde(rename = "Scheme")]
    scheme: &'a str,
    #[serde(rename = "Host")]
    host: String,
    #[serde(rename = "Path")]
    path: &'a str,
    #[serde(rename = "Query")]
    query: &'a str,
}

impl<'a> RequestView<'a> {
    fn new(ctx: &'a RequestContext) -> Self {
        let url = ctx.url();
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => String::new(),
        };

        // Multi-valued headers expose their first value.
        let mut headers = BTreeMap::new();
        for name in ctx.headers().keys() {
            if let Some(value) = ctx.headers().get(name).and_then(|v| v.to_str().ok()) {
                headers.insert(name.as_str(), value);
            }
        }

        Self {
            method: ctx.method().as_str(),
            url: UrlView {
                scheme: url.scheme(),
                host,
                path: url.path(),
                query: url.query().unwrap_or_default(),
            },
            headers,
        }
    }
}

/// A compiled CEL program together with its source text.
#[derive(Clone)]
pub struct Expression {
    source: String,
    program: Arc<Program>,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.source).finish()
    }
}

impl Expression {
    /// Compile an expression. Empty sources and syntax errors are configuration errors.
    pub fn compile(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::configuration("empty expression"));
        }

        let program = Program::compile(source).map_err(|err| {
            Error::configuration(format!("failed to compile expression '{source}': {err}"))
        })?;

        Ok(Self {
            source: source.to_owned(),
            program: Arc::new(program),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn evaluate(&self, ctx: &RequestContext, subject: Option<&Subject>) -> Result<Value> {
        let mut context = Context::default();
        context
            .add_variable("Request", RequestView::new(ctx))
            .map_err(|err| Error::ExpressionEvaluation(err.to_string()))?;
        context
            .add_variable("Subject", subject)
            .map_err(|err| Error::ExpressionEvaluation(err.to_string()))?;

        self.program.execute(&context).map_err(|err| {
            Error::ExpressionEvaluation(format!("'{}': {err}", self.source))
        })
    }

    /// Evaluate to a boolean. Any non-boolean result is an evaluation error.
    pub fn evaluate_bool(&self, ctx: &RequestContext, subject: Option<&Subject>) -> Result<bool> {
        match self.evaluate(ctx, subject)? {
            Value::Bool(result) => Ok(result),
            other => Err(Error::ExpressionEvaluation(format!(
                "'{}' did not evaluate to a boolean, got {other:?}",
                self.source
            ))),
        }
    }

    /// Evaluate to a string. Scalars are rendered, anything else is an error.
    pub fn evaluate_string(
        &self,
        ctx: &RequestContext,
        subject: Option<&Subject>,
    ) -> Result<String> {
        match self.evaluate(ctx, subject)? {
            Value::String(s) => Ok(s.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::UInt(u) => Ok(u.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(Error::ExpressionEvaluation(format!(
                "'{}' did not evaluate to a scalar, got {other:?}",
                self.source
            ))),
        }
    }
}
