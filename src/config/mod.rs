//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + rule set files (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → lifecycle::startup builds mechanisms, rules and router from it
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → full rebuild of mechanisms and rules
//!     → atomic swap of the active gateway
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_rule_set, ConfigError};
pub use schema::{GatewayConfig, OperationMode, RuleConfig};
