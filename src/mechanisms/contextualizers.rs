//! Built-in contextualizers.
//!
//! `static` adds a fixed set of attributes to the subject. An overlay merges its
//! attributes on top of the prototype's.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{MechanismKind, Result};
use crate::mechanisms::{
    decode_config, decode_optional_config, unsupported_type, Contextualizer, MechanismConfig,
};
use crate::pipeline::{RequestContext, Subject};

const KIND: MechanismKind = MechanismKind::Contextualizer;

pub fn create_prototype(
    id: &str,
    mechanism_type: &str,
    config: Option<&MechanismConfig>,
) -> Result<Arc<dyn Contextualizer>> {
    match mechanism_type {
        "static" => {
            let conf: StaticConfig = decode_optional_config(KIND, id, config)?;
            Ok(Arc::new(StaticContextualizer {
                id: id.to_owned(),
                attributes: conf.attributes,
            }))
        }
        other => Err(unsupported_type(KIND, other)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StaticConfig {
    attributes: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct StaticContextualizer {
    id: String,
    attributes: Map<String, Value>,
}

#[async_trait]
impl Contextualizer for StaticContextualizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Contextualizer>> {
        let overlay: StaticConfig = decode_config(KIND, &self.id, config)?;
        let mut attributes = self.attributes.clone();
        attributes.extend(overlay.attributes);

        Ok(Arc::new(Self {
            id: self.id.clone(),
            attributes,
        }))
    }

    async fn contextualize(&self, _ctx: &RequestContext, subject: &mut Subject) -> Result<()> {
        for (name, value) in &self.attributes {
            subject.attributes.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method};
    use serde_json::json;
    use url::Url;

    #[tokio::test]
    async fn test_static_attributes_and_overlay() {
        let ctx = RequestContext::new(
            Method::GET,
            Url::parse("http://foo.bar/").unwrap(),
            HeaderMap::new(),
        );
        let conf = json!({"attributes": {"tier": "gold", "region": "eu"}});
        let proto = create_prototype("ctx", "static", conf.as_object()).unwrap();

        let mut subject = Subject::new("alice");
        proto.contextualize(&ctx, &mut subject).await.unwrap();
        assert_eq!(subject.attribute("tier"), Some(&json!("gold")));

        let overlay = json!({"attributes": {"tier": "silver"}});
        let derived = proto.with_config(overlay.as_object().unwrap()).unwrap();
        let mut subject = Subject::new("bob");
        derived.contextualize(&ctx, &mut subject).await.unwrap();
        assert_eq!(subject.attribute("tier"), Some(&json!("silver")));
        assert_eq!(subject.attribute("region"), Some(&json!("eu")));
    }

    #[test]
    fn test_unknown_type() {
        assert!(create_prototype("ctx", "http", None).is_err());
    }
}
