//! Error types for integrity-core

use thiserror::Error;

/// Registry construction failures.
///
/// These are the only unrecoverable conditions in the core and are raised
/// before any run begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate row key: {0}")]
    DuplicateRowKey(String),

    #[error("Probe or sub-row key must not be empty")]
    EmptyKey,

    #[error("Multi-verdict probe '{0}' declares no sub-rows")]
    NoSubRows(String),
}

/// A probe invocation failure.
///
/// Always absorbed by the orchestrator and turned into Flagged rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("API not supported: {0}")]
    Unsupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("JavaScript error: {0}")]
    Js(String),

    #[error("Timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    #[error("Probe returned a {got} result, expected {expected}")]
    ShapeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Probe timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Keyword list '{0}' must not be empty")]
    EmptyKeywords(&'static str),

    #[error("Geolocation URL must use http or https: {0}")]
    InvalidUrl(String),
}
