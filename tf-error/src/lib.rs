//! Unified error handling for tfconf
//!
//! A single error type used by the configuration engine and the command line
//! front end. Variants are grouped by the corrective action they call for:
//! rejected edits, unavailable hardware, and failed privileged applies.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using TfconfError
pub type Result<T> = std::result::Result<T, TfconfError>;

/// Why a privileged apply did not complete.
///
/// A partial apply (file replaced, restart failed) is still a failure, so the
/// caller has to re-read the configuration to learn what is actually active.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyFailure {
    #[error("elevation prompt was dismissed")]
    Declined,

    #[error("not authorized to elevate")]
    NotAuthorized,

    #[error("could not install the new configuration file: {0}")]
    InstallFailed(String),

    #[error("configuration installed but the daemon failed to restart: {0}")]
    RestartFailed(String),

    #[error("no answer from the elevation helper after {0:?}")]
    TimedOut(Duration),

    #[error("could not start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("elevation helper exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

impl ApplyFailure {
    /// True when retrying the same request could succeed without changing
    /// anything on the system (the operator just has to answer the prompt).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Declined | Self::TimedOut(_))
    }
}

/// Unified error type for all tfconf operations
#[derive(thiserror::Error, Debug)]
pub enum TfconfError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Configuration Format Errors
    // ============================================================================
    #[error("Unrecognized thinkfan configuration: {0}")]
    Format(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Config(String),

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Sensor {path} is unavailable: {reason}")]
    SensorUnavailable {
        path: PathBuf,
        reason: String,
    },

    #[error("Sensor report unavailable: {0}")]
    SensorReport(String),

    // ============================================================================
    // Sensor Set Errors
    // ============================================================================
    #[error("Sensor {0} is already configured")]
    DuplicateSensor(String),

    #[error("Sensor {0} is not configured")]
    SensorNotFound(String),

    #[error("Cannot remove the last sensor")]
    LastSensor,

    // ============================================================================
    // Level Table Errors
    // ============================================================================
    #[error("Invalid temperature: {value}°C (must not be negative)")]
    InvalidTemperature {
        value: i32,
    },

    #[error("Boundary {value}°C rejected for level {level}, sensor {column}: {reason}")]
    BoundaryOrder {
        level: usize,
        column: usize,
        value: i32,
        reason: String,
    },

    #[error("Level {index} does not exist ({len} levels configured)")]
    LevelOutOfRange {
        index: usize,
        len: usize,
    },

    #[error("Sensor column {column} does not exist ({len} sensors configured)")]
    ColumnOutOfRange {
        column: usize,
        len: usize,
    },

    #[error("Level {0} has no lower limits")]
    MissingLowerLimit(usize),

    // ============================================================================
    // Apply Errors
    // ============================================================================
    #[error("Failed to apply configuration: {0}")]
    Apply(#[from] ApplyFailure),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl TfconfError {
    /// Create a format error from a string
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a settings error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sensor-unavailable error
    pub fn sensor_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a boundary-order error
    pub fn boundary(level: usize, column: usize, value: i32, reason: impl Into<String>) -> Self {
        Self::BoundaryOrder {
            level,
            column,
            value,
            reason: reason.into(),
        }
    }

    /// True for precondition violations that were rejected before any state
    /// was touched.
    pub fn is_rejected_edit(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSensor(_)
                | Self::SensorNotFound(_)
                | Self::LastSensor
                | Self::InvalidTemperature { .. }
                | Self::BoundaryOrder { .. }
                | Self::LevelOutOfRange { .. }
                | Self::ColumnOutOfRange { .. }
                | Self::MissingLowerLimit(_)
        )
    }
}
