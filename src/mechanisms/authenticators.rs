//! Built-in authenticators.
//!
//! | type           | behaviour                                          |
//! |----------------|----------------------------------------------------|
//! | `noop`         | empty subject, never fails                         |
//! | `anonymous`    | fixed subject id (`subject`, default `anonymous`)  |
//! | `unauthorized` | always fails with an authentication error          |
//! | `header`       | subject id taken from a request header             |

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    decode_config, decode_optional_config, reject_config, unsupported_type, Authenticator,
    MechanismConfig,
};
use crate::pipeline::{RequestContext, Subject};

const KIND: MechanismKind = MechanismKind::Authenticator;

/// Create an authenticator prototype of the given type.
pub fn create_prototype(
    id: &str,
    mechanism_type: &str,
    config: Option<&MechanismConfig>,
) -> Result<Arc<dyn Authenticator>> {
    match mechanism_type {
        "noop" => {
            reject_config(KIND, id, config)?;
            Ok(Arc::new(NoopAuthenticator { id: id.to_owned() }))
        }
        "anonymous" => {
            let conf: AnonymousConfig = decode_optional_config(KIND, id, config)?;
            Ok(Arc::new(AnonymousAuthenticator {
                id: id.to_owned(),
                subject: conf.subject.unwrap_or_else(|| "anonymous".to_owned()),
            }))
        }
        "unauthorized" => {
            reject_config(KIND, id, config)?;
            Ok(Arc::new(UnauthorizedAuthenticator { id: id.to_owned() }))
        }
        "header" => {
            let conf: HeaderConfig = decode_optional_config(KIND, id, config)?;
            Ok(Arc::new(HeaderAuthenticator {
                id: id.to_owned(),
                header: conf.header.unwrap_or_else(|| "X-User".to_owned()),
            }))
        }
        other => Err(unsupported_type(KIND, other)),
    }
}

#[derive(Debug, Clone)]
pub struct NoopAuthenticator {
    id: String,
}

#[async_trait]
impl Authenticator for NoopAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authenticator>> {
        reject_config(KIND, &self.id, Some(config))?;
        Ok(Arc::new(self.clone()))
    }

    async fn authenticate(&self, _ctx: &RequestContext) -> Result<Subject> {
        Ok(Subject::default())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnonymousConfig {
    subject: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnonymousAuthenticator {
    id: String,
    subject: String,
}

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authenticator>> {
        let overlay: AnonymousConfig = decode_config(KIND, &self.id, config)?;
        Ok(Arc::new(Self {
            id: self.id.clone(),
            subject: overlay.subject.unwrap_or_else(|| self.subject.clone()),
        }))
    }

    async fn authenticate(&self, _ctx: &RequestContext) -> Result<Subject> {
        Ok(Subject::new(self.subject.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct UnauthorizedAuthenticator {
    id: String,
}

#[async_trait]
impl Authenticator for UnauthorizedAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authenticator>> {
        reject_config(KIND, &self.id, Some(config))?;
        Ok(Arc::new(self.clone()))
    }

    async fn authenticate(&self, _ctx: &RequestContext) -> Result<Subject> {
        Err(Error::Authentication(format!(
            "denied by authenticator '{}'",
            self.id
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeaderConfig {
    header: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HeaderAuthenticator {
    id: String,
    header: String,
}

#[async_trait]
impl Authenticator for HeaderAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn Authenticator>> {
        let overlay: HeaderConfig = decode_config(KIND, &self.id, config)?;
        Ok(Arc::new(Self {
            id: self.id.clone(),
            header: overlay.header.unwrap_or_else(|| self.header.clone()),
        }))
    }

    async fn authenticate(&self, ctx: &RequestContext) -> Result<Subject> {
        match ctx.request_header(&self.header) {
            Some(value) if !value.is_empty() => Ok(Subject::new(value)),
            _ => Err(Error::Authentication(format!(
                "header '{}' missing",
                self.header
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method};
    use serde_json::json;
    use url::Url;

    fn context(headers: HeaderMap) -> RequestContext {
        RequestContext::new(Method::GET, Url::parse("http://foo.bar/").unwrap(), headers)
    }

    fn config(value: serde_json::Value) -> MechanismConfig {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_default_and_overlay() {
        let auth = create_prototype("anon", "anonymous", None).unwrap();
        let subject = auth.authenticate(&context(HeaderMap::new())).await.unwrap();
        assert_eq!(subject.id, "anonymous");

        let derived = auth.with_config(&config(json!({"subject": "guest"}))).unwrap();
        let subject = derived.authenticate(&context(HeaderMap::new())).await.unwrap();
        assert_eq!(subject.id, "guest");
        assert_eq!(derived.id(), "anon");

        // prototype is unchanged
        let subject = auth.authenticate(&context(HeaderMap::new())).await.unwrap();
        assert_eq!(subject.id, "anonymous");
    }

    #[tokio::test]
    async fn test_header_authenticator() {
        let auth =
            create_prototype("hdr", "header", Some(&config(json!({"header": "X-Id"})))).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-id", HeaderValue::from_static("alice"));
        let subject = auth.authenticate(&context(headers)).await.unwrap();
        assert_eq!(subject.id, "alice");

        let err = auth.authenticate(&context(HeaderMap::new())).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_always_fails() {
        let auth = create_prototype("deny", "unauthorized", None).unwrap();
        assert!(auth.authenticate(&context(HeaderMap::new())).await.is_err());
    }

    #[test]
    fn test_prototype_errors() {
        assert!(matches!(
            create_prototype("x", "jwt", None),
            Err(Error::UnsupportedMechanismType { .. })
        ));

        let err = create_prototype("x", "anonymous", Some(&config(json!({"foo": 1})))).unwrap_err();
        assert!(err.is_configuration());

        let noop = create_prototype("noop", "noop", None).unwrap();
        assert!(noop.with_config(&config(json!({"foo": 1}))).is_err());
        assert!(noop.with_config(&MechanismConfig::new()).is_ok());
    }
}
