//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values given on the command line. Each one set wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub contract: Option<PathBuf>,
    pub target: Option<String>,
    pub bind_address: Option<String>,
    pub verbose: bool,
}

impl ConfigOverrides {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(path) = self.contract {
            config.contract.path = Some(path);
        }
        if let Some(target) = self.target {
            config.upstream.target = target;
        }
        if let Some(bind_address) = self.bind_address {
            config.listener.bind_address = bind_address;
        }
        if self.verbose {
            config.verbose = true;
        }
    }
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    resolve_config(Some(path), ConfigOverrides::default())
}

/// Build the effective configuration: file (or defaults), then overrides,
/// then validation.
pub fn resolve_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            parse_config(&content)?
        }
        None => ProxyConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
