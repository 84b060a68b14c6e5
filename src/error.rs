// src/error.rs

use crate::validation::SchemaError;
use thiserror::Error;

/// Why the model resolver could not produce a usable result.
///
/// Always absorbed by the resolution coordinator, which falls back to the
/// rule-based planner.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionFailure {
    #[error("language service error: {0}")]
    Service(String),

    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error("model output failed validation: {}", join_schema_errors(.0))]
    Schema(Vec<SchemaError>),

    #[error("model resolver unavailable: {0}")]
    Unavailable(String),
}

fn join_schema_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Top-level error for the command-line front end.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("resolver produced an invalid instruction: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
