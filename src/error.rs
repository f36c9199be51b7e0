//! Error types for policy evaluation
//!
//! `validate` never returns these: every error folds into a `false` decision.
//! They surface through `explain`, the parsers, and configuration loading.

use thiserror::Error;

/// Policy operation result type
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Policy operation errors
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Policy payload failed to decode or did not match the policy schema
    #[error("Malformed policy document: {0}")]
    MalformedPolicy(#[source] serde_json::Error),

    /// Input payload failed to decode or was not a JSON object
    #[error("Malformed input document: {0}")]
    MalformedInput(String),

    /// Engine configuration could not be parsed
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
