//! Request-time pipeline execution.
//!
//! # Data Flow
//! ```text
//! RequestContext (method, url, headers)
//!     → composite.rs: subject creator (authenticator, unconditional)
//!     → composite.rs: subject handlers (contextualizers/authorizers, gated by condition.rs)
//!     → composite.rs: unifiers (gated by condition.rs)
//!     → on failure: composite.rs error handlers (first claiming handler wins)
//! ```
//!
//! # Design Decisions
//! - Composites are immutable and shared between rules via Arc
//! - Only the per-request context is mutated
//! - Conditions are compiled at rule build time, evaluated per request

pub mod composite;
pub mod condition;
pub mod context;
pub mod expression;
pub mod subject;

pub use composite::{
    CompositeErrorHandler, CompositeSubjectCreator, CompositeSubjectHandler, Step, SubjectHandler,
};
pub use condition::ExecutionCondition;
pub use context::RequestContext;
pub use expression::Expression;
pub use subject::Subject;
