//! Error types shared across Footfall crates.

use std::path::PathBuf;

/// Top-level error type for Footfall operations.
///
/// End of stream is not represented here: sources signal it by returning
/// `None`, and the pipeline treats it as the normal end of a run.
#[derive(Debug, thiserror::Error)]
pub enum FootfallError {
    /// Invalid settings detected before a run starts. Always fatal.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A single observation could not be used (non-finite or out-of-frame
    /// coordinates). Callers drop the observation and keep going.
    #[error("Observation anomaly: {message}")]
    ObservationAnomaly { message: String },

    /// An output sink could not be opened or written. Fatal for the run.
    #[error("Resource fault: {message}")]
    Resource { message: String },

    /// The observation source could not be opened.
    #[error("Failed to open source {path}: {message}")]
    SourceOpen { path: PathBuf, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FootfallError.
pub type FootfallResult<T> = Result<T, FootfallError>;

impl FootfallError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn anomaly(msg: impl Into<String>) -> Self {
        Self::ObservationAnomaly {
            message: msg.into(),
        }
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn source_open(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SourceOpen {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Observation anomalies are local to one observation; everything else
    /// is either a configuration or a resource problem.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ObservationAnomaly { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_is_not_fatal() {
        assert!(!FootfallError::anomaly("nan centroid").is_fatal());
        assert!(FootfallError::config("radius must be positive").is_fatal());
        assert!(FootfallError::resource("disk full").is_fatal());
    }

    #[test]
    fn test_error_messages_name_the_category() {
        let err = FootfallError::config("duplicate line name 'in'");
        assert_eq!(
            err.to_string(),
            "Configuration error: duplicate line name 'in'"
        );

        let err = FootfallError::source_open("/tmp/missing.jsonl", "no such file");
        assert!(err.to_string().contains("/tmp/missing.jsonl"));
    }
}
