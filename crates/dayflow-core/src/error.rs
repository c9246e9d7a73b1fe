//! Core error types for dayflow-core.
//!
//! This module defines the error hierarchy using thiserror. Most scheduling
//! outcomes (capacity exhaustion, empty patterns, dropped corrupt entities)
//! are NOT errors -- they are reported inside `ScheduleResult`. Errors here
//! are reserved for failures that abort a whole compute pass or for the
//! configuration layer.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dayflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Scheduling errors that abort a compute pass
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors that abort an entire compute pass.
///
/// A cyclic dependency graph must never be silently flattened into an
/// arbitrary order, so the whole pass fails and the caller keeps the
/// previous result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A workflow's dependency graph contains a cycle
    #[error("Dependency cycle in workflow '{workflow_id}' involving step '{step_id}'")]
    DependencyCycle { workflow_id: String, step_id: String },

    /// Input snapshot violated a structural precondition the sanitizer
    /// should have caught
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// No config directory available on this platform
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
