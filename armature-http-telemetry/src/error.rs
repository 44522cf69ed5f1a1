//! Error types for HTTP transport instrumentation

use thiserror::Error;

/// Result type alias for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Telemetry error types
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A metric instrument could not be created
    #[error("Cannot create instrument {name}: {reason}")]
    Instrument {
        /// Full instrument name
        name: String,
        /// Why the provider refused it
        reason: String,
    },
}

impl TelemetryError {
    /// Create an instrument error.
    pub fn instrument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Instrument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
