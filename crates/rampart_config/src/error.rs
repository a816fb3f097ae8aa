//! Error types for resource normalization and policy injection.

use rampart_overlay::{DecodeError, EncodeError};
use thiserror::Error;

/// Result type alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while normalizing a project document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid document structure: {0}")]
    Structure(String),

    #[error("Validation failed for {kind} '{name}': {rule}")]
    Validation { kind: String, name: String, rule: String },

    #[error("Policy application failed for {kind} '{name}': {reason}")]
    PolicyApplication { kind: String, name: String, reason: String },

    #[error("Failed to encode {context}: {source}")]
    Encode {
        context: String,
        #[source]
        source: EncodeError,
    },

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broad classes of failure, used by callers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Decode,
    Validation,
    Policy,
    Other,
}

impl ConfigError {
    pub fn decode(context: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn encode(context: impl Into<String>, source: EncodeError) -> Self {
        Self::Encode {
            context: context.into(),
            source,
        }
    }

    pub fn validation(kind: impl Into<String>, name: impl Into<String>, rule: impl Into<String>) -> Self {
        Self::Validation {
            kind: kind.into(),
            name: name.into(),
            rule: rule.into(),
        }
    }

    pub fn policy(kind: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PolicyApplication {
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::Decode { .. } | ConfigError::Structure(_) | ConfigError::Yaml(_) | ConfigError::Json(_) => {
                ErrorCategory::Decode
            }
            ConfigError::Validation { .. } => ErrorCategory::Validation,
            ConfigError::PolicyApplication { .. } => ErrorCategory::Policy,
            ConfigError::Encode { .. } | ConfigError::Settings(_) | ConfigError::Io(_) => ErrorCategory::Other,
        }
    }
}
