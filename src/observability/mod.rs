//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Rule id and source flow through pipeline log events

pub mod logging;
