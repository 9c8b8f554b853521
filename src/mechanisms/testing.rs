//! Recording mechanism doubles for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, MechanismKind, Result};
use crate::mechanisms::{
    Authenticator, Authorizer, Contextualizer, ErrorHandler, ErrorHandling, MechanismConfig,
    MechanismFactory, Unifier,
};
use crate::pipeline::{RequestContext, Subject};

/// Shared log of mechanism invocations, `"<kind>:<id>"` per call.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behaviour {
    Succeed,
    Fail,
    /// Error handlers only: claim the error and absorb it.
    Absorb,
    /// Error handlers only: pass the error on.
    Decline,
    /// Unifiers only: report an authorization error through the context and carry on.
    Report,
}

#[derive(Debug, Clone)]
pub(crate) struct Fake {
    id: String,
    behaviour: Behaviour,
    journal: Journal,
}

impl Fake {
    pub(crate) fn new(id: &str, behaviour: Behaviour, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_owned(),
            behaviour,
            journal: journal.clone(),
        })
    }

    fn record(&self, kind: MechanismKind) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{kind}:{}", self.id));
    }

    fn fails(&self) -> bool {
        self.behaviour == Behaviour::Fail
    }
}

pub(crate) fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[async_trait]
impl Authenticator for Fake {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, _config: &MechanismConfig) -> Result<Arc<dyn Authenticator>> {
        Ok(Arc::new(self.clone()))
    }

    async fn authenticate(&self, _ctx: &RequestContext) -> Result<Subject> {
        self.record(MechanismKind::Authenticator);
        if self.fails() {
            return Err(Error::Authentication(self.id.clone()));
        }
        Ok(Subject::new(self.id.clone()))
    }
}

#[async_trait]
impl Authorizer for Fake {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, _config: &MechanismConfig) -> Result<Arc<dyn Authorizer>> {
        Ok(Arc::new(self.clone()))
    }

    async fn authorize(&self, _ctx: &RequestContext, _subject: &Subject) -> Result<()> {
        self.record(MechanismKind::Authorizer);
        if self.fails() {
            return Err(Error::Authorization(self.id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Contextualizer for Fake {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, _config: &MechanismConfig) -> Result<Arc<dyn Contextualizer>> {
        Ok(Arc::new(self.clone()))
    }

    async fn contextualize(&self, _ctx: &RequestContext, subject: &mut Subject) -> Result<()> {
        self.record(MechanismKind::Contextualizer);
        if self.fails() {
            return Err(Error::Communication(self.id.clone()));
        }
        subject.attributes.insert(self.id.clone(), Value::Bool(true));
        Ok(())
    }
}

#[async_trait]
impl Unifier for Fake {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, _config: &MechanismConfig) -> Result<Arc<dyn Unifier>> {
        Ok(Arc::new(self.clone()))
    }

    async fn unify(&self, ctx: &mut RequestContext, subject: &Subject) -> Result<()> {
        self.record(MechanismKind::Unifier);
        if self.fails() {
            return Err(Error::Internal(self.id.clone()));
        }
        if self.behaviour == Behaviour::Report {
            ctx.set_pipeline_error(Error::Authorization(self.id.clone()));
        }
        ctx.add_upstream_header("X-Subject", &subject.id)
    }
}

#[async_trait]
impl ErrorHandler for Fake {
    fn id(&self) -> &str {
        &self.id
    }

    fn with_config(&self, _config: &MechanismConfig) -> Result<Arc<dyn ErrorHandler>> {
        Ok(Arc::new(self.clone()))
    }

    async fn handle_error(&self, _ctx: &mut RequestContext, error: Error) -> ErrorHandling {
        self.record(MechanismKind::ErrorHandler);
        match self.behaviour {
            Behaviour::Succeed => ErrorHandling::Handled(Some(error)),
            Behaviour::Absorb => ErrorHandling::Handled(None),
            Behaviour::Decline | Behaviour::Report => ErrorHandling::Declined(error),
            Behaviour::Fail => ErrorHandling::Handled(Some(Error::Internal(self.id.clone()))),
        }
    }
}

/// A creation request seen by [`FakeFactory`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CreationRequest {
    pub kind: MechanismKind,
    pub src_id: String,
    pub id: String,
    pub config: Option<MechanismConfig>,
}

/// Factory producing [`Fake`] mechanisms and recording every request.
#[derive(Debug, Default)]
pub(crate) struct FakeFactory {
    journal: Journal,
    behaviours: HashMap<String, Behaviour>,
    failing: HashSet<String>,
    requests: Mutex<Vec<CreationRequest>>,
}

impl FakeFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_behaviour(mut self, id: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(id.to_owned(), behaviour);
        self
    }

    /// Creation of the given id fails.
    pub(crate) fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_owned());
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub(crate) fn requests(&self) -> Vec<CreationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requested_kinds(&self) -> Vec<MechanismKind> {
        self.requests().into_iter().map(|r| r.kind).collect()
    }

    fn create(
        &self,
        kind: MechanismKind,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<Fake>> {
        self.requests.lock().unwrap().push(CreationRequest {
            kind,
            src_id: src_id.to_owned(),
            id: id.to_owned(),
            config: config.cloned(),
        });

        if self.failing.contains(id) {
            return Err(Error::mechanism_creation(
                kind,
                Error::Internal("test purpose".into()),
            ));
        }

        let behaviour = self
            .behaviours
            .get(id)
            .copied()
            .unwrap_or(Behaviour::Succeed);
        Ok(Fake::new(id, behaviour, &self.journal))
    }
}

impl MechanismFactory for FakeFactory {
    fn create_authenticator(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Authenticator>> {
        self.create(MechanismKind::Authenticator, src_id, id, config)
            .map(|m| m as Arc<dyn Authenticator>)
    }

    fn create_authorizer(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Authorizer>> {
        self.create(MechanismKind::Authorizer, src_id, id, config)
            .map(|m| m as Arc<dyn Authorizer>)
    }

    fn create_contextualizer(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Contextualizer>> {
        self.create(MechanismKind::Contextualizer, src_id, id, config)
            .map(|m| m as Arc<dyn Contextualizer>)
    }

    fn create_unifier(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn Unifier>> {
        self.create(MechanismKind::Unifier, src_id, id, config)
            .map(|m| m as Arc<dyn Unifier>)
    }

    fn create_error_handler(
        &self,
        src_id: &str,
        id: &str,
        config: Option<&MechanismConfig>,
    ) -> Result<Arc<dyn ErrorHandler>> {
        self.create(MechanismKind::ErrorHandler, src_id, id, config)
            .map(|m| m as Arc<dyn ErrorHandler>)
    }
}
