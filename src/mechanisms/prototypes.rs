//! Repository of configured mechanism prototypes.
//!
//! # Responsibilities
//! - Instantiate every prototype listed in the mechanisms configuration
//! - Reject duplicate ids per kind
//! - Look up prototypes by kind and id
//!
//! # Design Decisions
//! - Built once per configuration generation, immutable afterwards
//! - A broken prototype fails the whole repository (and with it the reload)

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::schema::{MechanismDefinition, MechanismsConfig};
use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    authenticators, authorizers, contextualizers, error_handlers, unifiers, Authenticator,
    Authorizer, Contextualizer, ErrorHandler, MechanismConfig, Unifier,
};

type Constructor<M> = fn(&str, &str, Option<&MechanismConfig>) -> Result<Arc<M>>;

#[derive(Debug, Default)]
pub struct PrototypeRepository {
    authenticators: HashMap<String, Arc<dyn Authenticator>>,
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    contextualizers: HashMap<String, Arc<dyn Contextualizer>>,
    unifiers: HashMap<String, Arc<dyn Unifier>>,
    error_handlers: HashMap<String, Arc<dyn ErrorHandler>>,
}

impl PrototypeRepository {
    pub fn new(config: &MechanismsConfig) -> Result<Self> {
        Ok(Self {
            authenticators: load(
                MechanismKind::Authenticator,
                &config.authenticators,
                authenticators::create_prototype,
            )?,
            authorizers: load(
                MechanismKind::Authorizer,
                &config.authorizers,
                authorizers::create_prototype,
            )?,
            contextualizers: load(
                MechanismKind::Contextualizer,
                &config.contextualizers,
                contextualizers::create_prototype,
            )?,
            unifiers: load(
                MechanismKind::Unifier,
                &config.unifiers,
                unifiers::create_prototype,
            )?,
            error_handlers: load(
                MechanismKind::ErrorHandler,
                &config.error_handlers,
                error_handlers::create_prototype,
            )?,
        })
    }

    pub fn authenticator(&self, id: &str) -> Result<Arc<dyn Authenticator>> {
        lookup(MechanismKind::Authenticator, &self.authenticators, id)
    }

    pub fn authorizer(&self, id: &str) -> Result<Arc<dyn Authorizer>> {
        lookup(MechanismKind::Authorizer, &self.authorizers, id)
    }

    pub fn contextualizer(&self, id: &str) -> Result<Arc<dyn Contextualizer>> {
        lookup(MechanismKind::Contextualizer, &self.contextualizers, id)
    }

    pub fn unifier(&self, id: &str) -> Result<Arc<dyn Unifier>> {
        lookup(MechanismKind::Unifier, &self.unifiers, id)
    }

    pub fn error_handler(&self, id: &str) -> Result<Arc<dyn ErrorHandler>> {
        lookup(MechanismKind::ErrorHandler, &self.error_handlers, id)
    }
}

fn load<M: ?Sized>(
    kind: MechanismKind,
    definitions: &[MechanismDefinition],
    create: Constructor<M>,
) -> Result<HashMap<String, Arc<M>>> {
    let mut prototypes = HashMap::with_capacity(definitions.len());

    for definition in definitions {
        if prototypes.contains_key(&definition.id) {
            return Err(Error::configuration(format!(
                "duplicate {kind} id '{}'",
                definition.id
            )));
        }

        let prototype = create(
            &definition.id,
            &definition.mechanism_type,
            definition.config.as_ref(),
        )
        .map_err(|err| Error::mechanism_creation(kind, err))?;

        debug!(
            kind = %kind,
            id = %definition.id,
            mechanism_type = %definition.mechanism_type,
            "Prototype created"
        );
        prototypes.insert(definition.id.clone(), prototype);
    }

    Ok(prototypes)
}

fn lookup<M: ?Sized>(
    kind: MechanismKind,
    prototypes: &HashMap<String, Arc<M>>,
    id: &str,
) -> Result<Arc<M>> {
    prototypes
        .get(id)
        .cloned()
        .ok_or_else(|| Error::NoSuchMechanism {
            kind,
            id: id.to_owned(),
        })
}
