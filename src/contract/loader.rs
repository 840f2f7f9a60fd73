//! Contract loading from disk.

use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::contract::document::ContractDocument;

/// Errors raised while reading a contract document. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("failed to read contract {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("contract is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("contract is not valid YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("contract has an unexpected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Serialization of a contract file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFormat {
    Json,
    Yaml,
}

impl ContractFormat {
    /// Guess from the file extension, then from the first non-blank byte.
    pub fn detect(path: &Path, content: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ContractFormat::Json,
            Some("yaml") | Some("yml") => ContractFormat::Yaml,
            _ if content.trim_start().starts_with('{') => ContractFormat::Json,
            _ => ContractFormat::Yaml,
        }
    }
}

/// Load a contract document from a JSON or YAML file.
pub fn load_contract(path: &Path) -> Result<ContractDocument, ContractError> {
    let content = fs::read_to_string(path).map_err(|source| ContractError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let format = ContractFormat::detect(path, &content);
    let document = parse_contract(&content, format)?;

    tracing::info!(
        path = %path.display(),
        format = ?format,
        base_path = %document.base_path,
        path_templates = document.paths.len(),
        "Contract loaded"
    );

    Ok(document)
}

/// Parse contract text in the given format.
pub fn parse_contract(content: &str, format: ContractFormat) -> Result<ContractDocument, ContractError> {
    let raw: Value = match format {
        ContractFormat::Json => serde_json::from_str(content).map_err(ContractError::Json)?,
        ContractFormat::Yaml => {
            // Going through serde_json turns integer keys such as `200:` into strings.
            let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(ContractError::Yaml)?;
            serde_json::to_value(yaml).map_err(ContractError::Shape)?
        }
    };

    ContractDocument::from_value(raw).map_err(ContractError::Shape)
}
