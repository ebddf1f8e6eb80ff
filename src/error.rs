//! Error types for the browser integrity checker
//!
//! This module provides the error taxonomy of the JS-facing layer with:
//! - Error classification (fatal vs retryable)
//! - User-friendly messages
//! - Error codes for programmatic handling
//!
//! Probe failures never show up here. They are absorbed by the orchestrator
//! and reported as Flagged rows.

use integrity_core::{ConfigError, RegistryError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, CheckError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Setup errors (1xx)
    InvalidConfig = 100,
    InvalidRegistry = 101,

    // Run state errors (2xx)
    AlreadyRunning = 200,

    // Environment errors (3xx)
    NoWindow = 300,
    NoDocument = 301,
    ListenerFailed = 302,
    DomError = 303,

    // Serialization errors (4xx)
    SerializationError = 400,
}

/// Main error type for the checker
#[derive(Error, Debug, Clone)]
pub enum CheckError {
    // ===== Setup Errors =====
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid probe registry: {0}")]
    Registry(#[from] RegistryError),

    // ===== Run State Errors =====
    #[error("A check is already in progress")]
    AlreadyRunning,

    // ===== Environment Errors =====
    #[error("No global window object")]
    NoWindow,

    #[error("No document on window")]
    NoDocument,

    #[error("Failed to install listener for '{event}': {reason}")]
    Listener { event: &'static str, reason: String },

    #[error("DOM error: {0}")]
    Dom(String),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CheckError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckError::Config(_) => ErrorCode::InvalidConfig,
            CheckError::Registry(_) => ErrorCode::InvalidRegistry,
            CheckError::AlreadyRunning => ErrorCode::AlreadyRunning,
            CheckError::NoWindow => ErrorCode::NoWindow,
            CheckError::NoDocument => ErrorCode::NoDocument,
            CheckError::Listener { .. } => ErrorCode::ListenerFailed,
            CheckError::Dom(_) => ErrorCode::DomError,
            CheckError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Whether this error makes the checker unusable
    ///
    /// A fatal error means no run can ever succeed in this page; the checker
    /// should not be retried without fixing the page or the configuration.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CheckError::Registry(_) | CheckError::NoWindow | CheckError::NoDocument
        )
    }

    /// Whether the same call may succeed later without any change
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckError::AlreadyRunning)
    }

    /// Get a user-friendly message for display
    pub fn user_message(&self) -> String {
        match self {
            CheckError::Config(_) => {
                "The check configuration is invalid. Please review the options.".into()
            }
            CheckError::Registry(_) => {
                "The list of checks is inconsistent. Please report this bug.".into()
            }
            CheckError::AlreadyRunning => {
                "A system check is already running. Please wait for it to finish.".into()
            }
            CheckError::NoWindow | CheckError::NoDocument => {
                "The system check must run inside a web page.".into()
            }
            CheckError::Listener { .. } => {
                "Some activity monitors could not be started. Results may be incomplete.".into()
            }
            CheckError::Dom(_) => "The results table could not be updated.".into(),
            CheckError::Serialization(_) => "Failed to convert check results.".into(),
        }
    }
}

impl From<serde_wasm_bindgen::Error> for CheckError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        CheckError::Serialization(err.to_string())
    }
}

impl CheckError {
    /// Wrap a DOM call failure.
    pub fn dom(err: JsValue) -> Self {
        CheckError::Dom(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
    }
}

impl From<CheckError> for JsValue {
    fn from(err: CheckError) -> Self {
        let info = ErrorInfo::from(&err);
        serde_wasm_bindgen::to_value(&info).unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
    }
}

/// Error information for JavaScript consumption
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub user_message: String,
    pub is_fatal: bool,
    pub is_retryable: bool,
}

impl From<&CheckError> for ErrorInfo {
    fn from(err: &CheckError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            user_message: err.user_message(),
            is_fatal: err.is_fatal(),
            is_retryable: err.is_retryable(),
        }
    }
}
