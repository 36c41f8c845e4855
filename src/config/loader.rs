//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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

/// Values given on the command line; each one replaces the file's value.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub upstream_url: Option<String>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut RelayConfig) {
        if let Some(bind) = self.bind_address {
            config.listener.bind_address = bind;
        }
        if let Some(url) = self.upstream_url {
            config.upstream.url = url;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

/// Read the optional TOML file, apply overrides, validate once.
pub fn load_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<RelayConfig, ConfigError> {
    let content = path.map(fs::read_to_string).transpose()?;
    resolve_config(content.as_deref(), overrides)
}

/// Same as [`load_config`] with the TOML text already in hand.
/// `None` starts from the defaults.
pub fn resolve_config(
    content: Option<&str>,
    overrides: ConfigOverrides,
) -> Result<RelayConfig, ConfigError> {
    let mut config: RelayConfig = match content {
        Some(text) => toml::from_str(text)?,
        None => RelayConfig::default(),
    };
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
