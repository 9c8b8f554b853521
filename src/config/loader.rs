//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RuleSetConfig};
use crate::config::validation::{validate_config, validate_rule_set, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = read(path)?;
    let config = parse_config(&content).map_err(|err| match err {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })?;

    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: "<inline>".to_string(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate a rule set file.
pub fn load_rule_set(path: &Path) -> Result<RuleSetConfig, ConfigError> {
    let content = read(path)?;
    let rule_set: RuleSetConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    validate_rule_set(&rule_set).map_err(ConfigError::Validation)?;

    Ok(rule_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [serve]
            bind_address = "127.0.0.1:9000"

            [[mechanisms.authenticators]]
            id = "anon"
            type = "anonymous"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.serve.bind_address, "127.0.0.1:9000");
        assert_eq!(config.mechanisms.authenticators[0].mechanism_type, "anonymous");
    }

    #[test]
    fn test_load_errors() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let err = parse_config("[serve").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse_config("[serve]\nbind_address = \"nope\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("bind_address"));
    }

    #[test]
    fn test_load_rule_set() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            version = "1"
            name = "api"

            [[rules]]
            id = "public"
            match = {{ url = "http://foo.bar/public/**" }}
            execute = [{{ authenticator = "anon" }}, {{ unifier = "noop" }}]
            "#
        )
        .unwrap();

        let rule_set = load_rule_set(file.path()).unwrap();
        assert_eq!(rule_set.name, "api");
        assert_eq!(rule_set.rules.len(), 1);
    }
}
