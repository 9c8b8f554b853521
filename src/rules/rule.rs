//! A compiled rule.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::pipeline::{
    CompositeErrorHandler, CompositeSubjectCreator, CompositeSubjectHandler, RequestContext,
};
use crate::routing::matcher::UrlMatcher;
use crate::rules::upstream::UpstreamUrlFactory;

/// The execute part of a rule, shared with the default rule when inherited.
#[derive(Debug, Clone, Default)]
pub struct ExecutePipeline {
    pub sc: Arc<CompositeSubjectCreator>,
    pub sh: Arc<CompositeSubjectHandler>,
    pub un: Arc<CompositeSubjectHandler>,
}

/// An immutable rule, ready to execute requests.
pub struct Rule {
    pub(crate) id: String,
    pub(crate) src_id: String,
    pub(crate) is_default: bool,
    pub(crate) methods: Vec<String>,
    pub(crate) url_matcher: Option<UrlMatcher>,
    pub(crate) execute: ExecutePipeline,
    pub(crate) on_error: Arc<CompositeErrorHandler>,
    pub(crate) upstream: Option<UpstreamUrlFactory>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("src_id", &self.src_id)
            .field("is_default", &self.is_default)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl Rule {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Origin of the rule definition.
    pub fn src_id(&self) -> &str {
        &self.src_id
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn execute_pipeline(&self) -> &ExecutePipeline {
        &self.execute
    }

    pub fn error_pipeline(&self) -> &Arc<CompositeErrorHandler> {
        &self.on_error
    }

    /// True if the URL matches. The default rule matches every URL.
    pub fn matches_url(&self, url: &Url) -> bool {
        self.url_matcher.as_ref().map_or(true, |m| m.matches(url))
    }

    pub fn matches_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Run the rule against a request.
    ///
    /// On success returns the upstream URL (proxy mode only). On failure the
    /// error pipeline decides the outcome: an absorbed error yields `Ok(None)`.
    pub async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Url>> {
        debug!(rule = %self.id, src = %self.src_id, "Executing rule");

        if let Err(err) = self.run_pipeline(ctx).await {
            debug!(rule = %self.id, error = %err, "Pipeline failed, executing error handlers");
            self.on_error.execute(ctx, err).await?;
            return Ok(None);
        }

        Ok(self.upstream.as_ref().map(|u| u.create_url(ctx.url())))
    }

    async fn run_pipeline(&self, ctx: &mut RequestContext) -> Result<()> {
        let mut subject = self.execute.sc.execute(ctx).await?;

        let result = match self.execute.sh.execute(ctx, &mut subject).await {
            Ok(()) => self.execute.un.execute(ctx, &mut subject).await,
            Err(err) => Err(err),
        };

        ctx.set_subject(subject);
        result
    }
}
