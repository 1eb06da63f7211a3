//! Error types for Synheart Motion

use thiserror::Error;

use crate::types::StepMode;

/// Errors that can occur while driving the motion core
#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Configuration mismatch: {operation} is not available in {mode} mode")]
    ConfigurationMismatch {
        operation: &'static str,
        mode: StepMode,
    },

    #[error("Invalid accelerometer sample: {0}")]
    InvalidSample(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MotionError {
    /// Stable machine-readable code, used by the FFI and CLI surfaces
    pub fn code(&self) -> &'static str {
        match self {
            MotionError::ConfigurationMismatch { .. } => "CONFIGURATION_MISMATCH",
            MotionError::InvalidSample(_) => "INVALID_SAMPLE",
            MotionError::InvalidConfig(_) => "INVALID_CONFIG",
            MotionError::JsonError(_) => "JSON_ERROR",
        }
    }
}
