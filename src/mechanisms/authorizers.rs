//! Built-in authorizers: `allow`, `deny` and `cel`.
//!
//! The `cel` authorizer evaluates a list of expressions against the request
//! and the subject. All of them must hold.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    decode_config, decode_optional_config, reject_config, unsupported_type, Authorizer,
    MechanismConfig,
};
use crate::pipeline::{Expression, RequestContext, Subject};

const KIND: MechanismKind = MechanismKind::Authorizer;

pub fn create_prototype(
    id: &str,
    mechanism_type: &str,
    config: Option<&MechanismConfig>,
) -> Result<Arc<dyn Authorizer>> {
    match mechanism_type {
        "allow" => {
            reject_config(KIND, id, config)?;
            Ok(Arc::new(AllowAuthorizer { id: id.to_owned() }))
        }
        "deny" => {
            reject_config(KIND, id, config)?;
            Ok(Arc::new(DenyAuthorizer { id: id.to_owned() }))
        }
        "cel" => {
            let conf: CelConfig = decode_optional_config(KIND, id, config)?;
            let expressions = conf.expressions.unwrap_or_default();
            Ok(Arc::new(CelAuthorizer::new(id, &expressions)?))
        }
        other => Err(unsupported_type(KIND, other)),
    }
}

#[derive(Debug, Clone)]
pub struct AllowAuthorizer {
    id: String,
}

#[async_trait]
impl Authorizer for AllowAuthorizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authorizer>> {
        reject_config(KIND, &self.id, Some(config))?;
        Ok(Arc::new(self.clone()))
    }

    async fn authorize(&self, _ctx: &RequestContext, _subject: &Subject) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DenyAuthorizer {
    id: String,
}

#[async_trait]
impl Authorizer for DenyAuthorizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authorizer>> {
        reject_config(KIND, &self.id, Some(config))?;
        Ok(Arc::new(self.clone()))
    }

    async fn authorize(&self, _ctx: &RequestContext, _subject: &Subject) -> Result<()> {
        Err(Error::Authorization(format!(
            "denied by authorizer '{}'",
            self.id
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CelConfig {
    expressions: Option<Vec<ExpressionConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpressionConfig {
    expression: String,
    message: Option<String>,
}

#[derive(Debug)]
struct CompiledExpression {
    expression: Expression,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CelAuthorizer {
    id: String,
    expressions: Arc<Vec<CompiledExpression>>,
}

impl CelAuthorizer {
    fn new(id: &str, sources: &[ExpressionConfig]) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::configuration(format!(
                "no expressions provided for authorizer '{id}'"
            )));
        }

        let expressions = sources
            .iter()
            .map(|source| {
                Ok(CompiledExpression {
                    expression: Expression::compile(&source.expression)?,
                    message: source.message.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: id.to_owned(),
            expressions: Arc::new(expressions),
        })
    }
}

#[async_trait]
impl Authorizer for CelAuthorizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authorizer>> {
        let overlay: CelConfig = decode_config(KIND, &self.id, config)?;
        match overlay.expressions {
            Some(expressions) => Ok(Arc::new(Self::new(&self.id, &expressions)?)),
            None => Ok(Arc::new(self.clone())),
        }
    }

    async fn authorize(&self, ctx: &RequestContext, subject: &Subject) -> Result<()> {
        for compiled in self.expressions.iter() {
            if !compiled.expression.evaluate_bool(ctx, Some(subject))? {
                let message = compiled.message.clone().unwrap_or_else(|| {
                    format!("expression '{}' failed", compiled.expression.source())
                });
                return Err(Error::Authorization(message));
            }
        }

        Ok(())
    }
}
