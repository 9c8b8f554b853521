//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, scheme://host/path)
//!     → router.rs (rule lookup in definition order)
//!     → matcher.rs (evaluate URL pattern, then method list)
//!     → Return: matched Rule, default Rule, or NoRuleFound/MethodNotAllowed
//!
//! Rule Compilation (at startup and on reload):
//!     RuleConfig[]
//!     → rules::RuleFactory (patterns compiled via matcher.rs)
//!     → Freeze as immutable RuleRouter
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same rule
//! - First match wins (definition order)

pub mod matcher;
pub mod router;

pub use router::RuleRouter;
