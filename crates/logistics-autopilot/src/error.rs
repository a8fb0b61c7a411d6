//! Error taxonomy for fetching, dispatching and configuration.
//!
//! Extraction has no error type: malformed markup degrades to absent fields
//! or empty record lists. Everything that can fail per entity ends up as an
//! [`ErrorKind`] in the cycle report instead of aborting the pass.

use serde::{Deserialize, Serialize};

use crate::types::EntityKind;

/// Transport-level failure (DNS, refused connection, timeout, truncated body).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("request to {url} failed: {reason}")]
pub struct NetworkError {
    pub url: String,
    pub reason: String,
}

impl NetworkError {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of one entity's action chain.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The server answered with a sentinel that is not a success code.
    #[error("rejected by server ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    /// The action has no request chain for this kind of entity.
    #[error("{action} does not apply to {entity} records")]
    NotApplicable {
        entity: EntityKind,
        action: &'static str,
    },

    #[error("action chain cancelled")]
    Cancelled,
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Network(_) => ErrorKind::Network,
            ActionError::Rejected { .. } => ErrorKind::Rejected,
            ActionError::Parse(_) => ErrorKind::Parse,
            ActionError::NotApplicable { .. } => ErrorKind::NotApplicable,
            ActionError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Serializable failure summary used in [`crate::cycle::CycleReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Parse,
    Rejected,
    MissingIdentifier,
    NotApplicable,
    Cancelled,
}

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid endpoint '{name}' ({template}): {reason}")]
    InvalidEndpoint {
        name: String,
        template: String,
        reason: String,
    },

    #[error("Invalid status selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Cannot build HTTP client: {0}")]
    HttpClient(String),
}

/// Convenience result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;
