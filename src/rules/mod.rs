//! Rule compilation.
//!
//! # Data Flow
//! ```text
//! RuleConfig (id, match, forward_to, methods, execute, on_error)
//!     → factory.rs: proxy-mode checks, URL pattern, pipeline walk
//!     → mechanisms::MechanismFactory (one instance per step)
//!     → methods.rs (ALL / !METHOD expansion)
//!     → upstream.rs (proxy mode only)
//!     → rule.rs: immutable Rule
//! ```
//!
//! # Design Decisions
//! - Compilation fails fast with a configuration or mechanism creation error
//! - Empty sections of a rule inherit the default rule's compiled pipelines by reference

pub mod factory;
pub mod methods;
pub mod rule;
pub mod upstream;

pub use factory::RuleFactory;
pub use methods::expand_http_methods;
pub use rule::{ExecutePipeline, Rule};
pub use upstream::UpstreamUrlFactory;
