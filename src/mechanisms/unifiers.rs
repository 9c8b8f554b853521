//! Built-in unifiers.
//!
//! - `noop` leaves the request untouched
//! - `header` renders headers from expressions, e.g. `X-User-Id = "Subject.ID"`

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::HeaderName;
use serde::Deserialize;

use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    decode_config, decode_optional_config, reject_config, unsupported_type, MechanismConfig,
    Unifier,
};
use crate::pipeline::{Expression, RequestContext, Subject};

const KIND: MechanismKind = MechanismKind::Unifier;

pub fn create_prototype(
    id: &str,
    mechanism_type: &str,
    config: Option<&MechanismConfig>,
) -> Result<Arc<dyn Unifier>> {
    match mechanism_type {
        "noop" => {
            reject_config(KIND, id, config)?;
            Ok(Arc::new(NoopUnifier { id: id.to_owned() }))
        }
        "header" => {
            let conf: HeaderConfig = decode_optional_config(KIND, id, config)?;
            Ok(Arc::new(HeaderUnifier::new(id, conf.headers)?))
        }
        other => Err(unsupported_type(KIND, other)),
    }
}

#[derive(Debug, Clone)]
pub struct NoopUnifier {
    id: String,
}

#[async_trait]
impl Unifier for NoopUnifier {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Unifier>> {
        reject_config(KIND, &self.id, Some(config))?;
        Ok(Arc::new(self.clone()))
    }

    async fn unify(&self, _ctx: &mut RequestContext, _subject: &Subject) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HeaderConfig {
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct HeaderUnifier {
    id: String,
    sources: BTreeMap<String, String>,
    headers: Arc<Vec<(String, Expression)>>,
}

impl HeaderUnifier {
    fn new(id: &str, sources: BTreeMap<String, String>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::configuration(format!(
                "no headers defined for unifier '{id}'"
            )));
        }

        let mut headers = Vec::with_capacity(sources.len());
        for (name, source) in &sources {
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                Error::configuration(format!("invalid header name '{name}' in unifier '{id}': {err}"))
            })?;
            headers.push((name.clone(), Expression::compile(source)?));
        }

        Ok(Self {
            id: id.to_owned(),
            sources,
            headers: Arc::new(headers),
        })
    }
}

#[async_trait]
impl Unifier for HeaderUnifier {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Unifier>> {
        let overlay: HeaderConfig = decode_config(KIND, &self.id, config)?;
        let mut sources = self.sources.clone();
        sources.extend(overlay.headers);
        Ok(Arc::new(Self::new(&self.id, sources)?))
    }

    async fn unify(&self, ctx: &mut RequestContext, subject: &Subject) -> Result<()> {
        for (name, expression) in self.headers.iter() {
            let value = expression.evaluate_string(ctx, Some(subject))?;
            ctx.add_upstream_header(name, &value)?;
        }
        Ok(())
    }
}
