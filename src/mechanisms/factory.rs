//! Mechanism creation for rule compilation.
//!
//! # Responsibilities
//! - Resolve a step's mechanism id to its prototype
//! - Apply a rule-level overlay, producing a fresh instance
//! - Report every failure as a mechanism creation error of the requested kind
//!
//! # Design Decisions
//! - The rule factory only sees the [`MechanismFactory`] trait, so tests can
//!   substitute a recording double
//! - Without overlay the prototype instance itself is returned

use std::sync::Arc;

use tracing::trace;

use crate::config::schema::MechanismsConfig;
use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    Authenticator, Authorizer, Contextualizer, ErrorHandler, MechanismConfig, PrototypeRepository,
    Unifier,
};

/// Creates mechanism instances for rules.
///
/// `src_id` identifies the origin of the rule requesting the mechanism.
pub trait MechanismFactory: Send + Sync {
    fn create_authenticator(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Authenticator>>;

    fn create_authorizer(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Authorizer>>;

    fn create_contextualizer(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Contextualizer>>;

    fn create_unifier(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Unifier>>;

    fn create_error_handler(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn ErrorHandler>>;
}

/// [`MechanismFactory`] backed by a [`PrototypeRepository`].
#[derive(Debug)]
pub struct PrototypeMechanismFactory {
    repository: PrototypeRepository,
}

impl PrototypeMechanismFactory {
    pub fn new(config: &MechanismsConfig) -> Result<Self> {
        Ok(Self {
            repository: PrototypeRepository::new(config)?,
        })
    }
}

fn instantiate<M: ?Sized>(
    kind: MechanismKind,
    src_id: &str,
    id: &str,
    prototype: Result<Arc<M>>,
    config: Option<&MechanismConfig>,
    configure: impl FnOnce(&M, &MechanismConfig) -> Result<Arc<M>>,
) -> Result<Arc<M>> {
    let prototype = prototype.map_err(|err| Error::mechanism_creation(kind, err))?;

    match config {
        Some(config) => {
            trace!(kind = %kind, id, src = src_id, "Applying rule specific configuration");
            configure(&*prototype, config).map_err(|err| Error::mechanism_creation(kind, err))
        }
        None => Ok(prototype),
    }
}

impl MechanismFactory for PrototypeMechanismFactory {
    fn create_authenticator(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Authenticator>> {
        instantiate(
            MechanismKind::Authenticator,
            src_id,
            id,
            self.repository.authenticator(id),
            config,
            |proto, conf| proto.with_config(conf),
        )
    }

    fn create_authorizer(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Authorizer>> {
        instantiate(
            MechanismKind::Authorizer,
            src_id,
            id,
            self.repository.authorizer(id),
            config,
            |proto, conf| proto.with_config(conf),
        )
    }

    fn create_contextualizer(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Contextualizer>> {
        instantiate(
            MechanismKind::Contextualizer,
            src_id,
            id,
            self.repository.contextualizer(id),
            config,
            |proto, conf| proto.with_config(conf),
        )
    }

    fn create_unifier(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Unifier>> {
        instantiate(
            MechanismKind::Unifier,
            src_id,
            id,
            self.repository.unifier(id),
            config,
            |proto, conf| proto.with_config(conf),
        )
    }

    fn create_error_handler(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn ErrorHandler>> {
        instantiate(
            MechanismKind::ErrorHandler,
            src_id,
            id,
            self.repository.error_handler(id),
            config,
            |proto, conf| proto.with_config(conf),
        )
    }
}
