//! Built-in error handlers.
//!
//! - `default` claims every error and passes it on unchanged
//! - `redirect` claims authentication errors and turns them into a redirect

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    decode_config, decode_optional_config, reject_config, unsupported_type, ErrorHandler,
    ErrorHandling, MechanismConfig,
};
use crate::pipeline::RequestContext;

const KIND: MechanismKind = MechanismKind::ErrorHandler;

const DEFAULT_REDIRECT_CODE: u16 = 302;

pub fn create_prototype(
    id: &str,
    mechanism_type: &str,
    config: Option<&MechanismConfig>,
) -> Result<Arc<dyn ErrorHandler>> {
    match mechanism_type {
        "default" => {
            reject_config(KIND, id, config)?;
            Ok(Arc::new(DefaultErrorHandler { id: id.to_owned() }))
        }
        "redirect" => {
            let conf: RedirectConfig = decode_optional_config(KIND, id, config)?;
            let to = conf.to.ok_or_else(|| {
                Error::configuration(format!("no redirect target defined for '{id}'"))
            })?;
            Ok(Arc::new(RedirectErrorHandler::new(
                id,
                to,
                conf.code.unwrap_or(DEFAULT_REDIRECT_CODE),
            )?))
        }
        other => Err(unsupported_type(KIND, other)),
    }
}

#[derive(Debug, Clone)]
pub struct DefaultErrorHandler {
    id: String,
}

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn ErrorHandler>> {
        reject_config(KIND, &self.id, Some(config))?;
        Ok(Arc::new(self.clone()))
    }

    async fn handle_error(&self, _ctx: &mut RequestContext, error: Error) -> ErrorHandling {
        ErrorHandling::Handled(Some(error))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RedirectConfig {
    to: Option<Url>,
    code: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct RedirectErrorHandler {
    id: String,
    to: Url,
    code: u16,
}

impl RedirectErrorHandler {
    fn new(id: &str, to: Url, code: u16) -> Result<Self> {
        if !(300..400).contains(&code) {
            return Err(Error::configuration(format!(
                "redirect code {code} of '{id}' is not a 3xx status"
            )));
        }

        Ok(Self {
            id: id.to_owned(),
            to,
            code,
        })
    }
}

#[async_trait]
impl ErrorHandler for RedirectErrorHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, config: &MechanismConfig) -> Result<Arc<dyn ErrorHandler>> {
        let overlay: RedirectConfig = decode_config(KIND, &self.id, config)?;
        Ok(Arc::new(Self::new(
            &self.id,
            overlay.to.unwrap_or_else(|| self.to.clone()),
            overlay.code.unwrap_or(self.code),
        )?))
    }

    async fn handle_error(&self, _ctx: &mut RequestContext, error: Error) -> ErrorHandling {
        match error {
            Error::Authentication(_) => ErrorHandling::Handled(Some(Error::Redirect {
                to: self.to.clone(),
                code: self.code,
            })),
            other => ErrorHandling::Declined(other),
        }
    }
}
