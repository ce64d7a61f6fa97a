//! Error types for the report pipeline
//!
//! Each pipeline stage has its own error type so callers can branch on the
//! kind of failure instead of matching strings. [`ReportError`] is what the
//! orchestrator hands back to whoever invoked it.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ReportKind;

/// Failure while retrieving or normalising forecast data
#[derive(Error, Debug)]
pub enum FetchError {
    /// Coordinates outside of the valid latitude/longitude ranges
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    /// The upstream service did not answer in time
    #[error("Request to {endpoint} timed out after {seconds}s")]
    Timeout { endpoint: String, seconds: u64 },

    /// Connection level failure
    #[error("Network error: {message}")]
    Network { message: String },

    /// Non-success HTTP status
    #[error("HTTP {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    /// Response body missing expected fields or not parseable
    #[error("Malformed response: {message}")]
    Malformed { message: String },
}

impl FetchError {
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

/// A derivation had no valid samples to work with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Insufficient data for {metric}")]
pub struct InsufficientData {
    pub metric: &'static str,
}

impl InsufficientData {
    #[must_use]
    pub fn new(metric: &'static str) -> Self {
        Self { metric }
    }
}

/// Failure to produce a single chart; never fatal for the report
#[derive(Error, Debug)]
pub enum ChartRenderError {
    #[error("No data for chart '{chart}'")]
    NoData { chart: String },

    #[error("Drawing chart '{chart}' failed: {message}")]
    Drawing { chart: String, message: String },

    #[error("Chart '{chart}' produced an invalid image buffer")]
    Encoding { chart: String },
}

/// Failure while writing the PDF document
#[derive(Error, Debug)]
pub enum DocumentWriteError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF error: {message}")]
    Pdf { message: String },
}

impl DocumentWriteError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn pdf<S: Into<String>>(message: S) -> Self {
        Self::Pdf {
            message: message.into(),
        }
    }
}

/// Why forecast data could not be used for a report
#[derive(Error, Debug)]
pub enum DataUnavailableCause {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Insufficient(#[from] InsufficientData),
}

/// Terminal state of one report generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    DataUnavailable,
    WriteFailed,
}

/// Failure outcome of the report orchestrator
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Forecast data unavailable for {location} ({kind}): {cause}")]
    DataUnavailable {
        location: String,
        kind: ReportKind,
        #[source]
        cause: DataUnavailableCause,
    },

    #[error("Writing {kind} report for {location} failed: {source}")]
    WriteFailed {
        location: String,
        kind: ReportKind,
        #[source]
        source: DocumentWriteError,
    },
}

impl ReportError {
    pub fn data_unavailable(
        location: &str,
        kind: ReportKind,
        cause: impl Into<DataUnavailableCause>,
    ) -> Self {
        Self::DataUnavailable {
            location: location.to_string(),
            kind,
            cause: cause.into(),
        }
    }

    pub fn write_failed(location: &str, kind: ReportKind, source: DocumentWriteError) -> Self {
        Self::WriteFailed {
            location: location.to_string(),
            kind,
            source,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            ReportError::DataUnavailable { .. } => Outcome::DataUnavailable,
            ReportError::WriteFailed { .. } => Outcome::WriteFailed,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ReportError::DataUnavailable {
                location,
                cause: DataUnavailableCause::Fetch(FetchError::InvalidCoordinates { .. }),
                ..
            } => format!("Invalid coordinates for {location}."),
            ReportError::DataUnavailable {
                location,
                cause: DataUnavailableCause::Fetch(_),
                ..
            } => format!(
                "Unable to fetch forecast data for {location}. Please check your internet connection."
            ),
            ReportError::DataUnavailable {
                location, kind, ..
            } => format!("The forecast for {location} has no usable data for a {kind} report."),
            ReportError::WriteFailed { source, .. } => {
                format!("Report could not be written ({source}). Please check file permissions.")
            }
        }
    }
}

/// Invalid configuration value
#[derive(Error, Debug)]
#[error("Configuration error: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure while handing a finished report to a delivery channel
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatch channel '{channel}' is not configured")]
    NotConfigured { channel: String },

    #[error("Reading report {} failed: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Delivery via {channel} failed: {message}")]
    Delivery { channel: String, message: String },
}

impl DispatchError {
    pub fn delivery<S: Into<String>>(channel: &str, message: S) -> Self {
        Self::Delivery {
            channel: channel.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_mapping() {
        let fetch = ReportError::data_unavailable(
            "BellsBeach",
            ReportKind::Surf,
            FetchError::network("connection refused"),
        );
        assert_eq!(fetch.outcome(), Outcome::DataUnavailable);

        let empty = ReportError::data_unavailable(
            "BellsBeach",
            ReportKind::Sky,
            InsufficientData::new("cloud cover"),
        );
        assert_eq!(empty.outcome(), Outcome::DataUnavailable);

        let write = ReportError::write_failed(
            "BellsBeach",
            ReportKind::Weather,
            DocumentWriteError::pdf("broken"),
        );
        assert_eq!(write.outcome(), Outcome::WriteFailed);
    }

    #[test]
    fn test_user_messages() {
        let err = ReportError::data_unavailable(
            "LakeTyrrell",
            ReportKind::Sky,
            FetchError::InvalidCoordinates { lat: 91.0, lon: 0.0 },
        );
        assert!(err.user_message().contains("Invalid coordinates"));

        let err = ReportError::data_unavailable(
            "LakeTyrrell",
            ReportKind::Sky,
            FetchError::Timeout {
                endpoint: "forecast".to_string(),
                seconds: 15,
            },
        );
        assert!(err.user_message().contains("Unable to fetch"));

        let err = ReportError::data_unavailable(
            "LakeTyrrell",
            ReportKind::Sky,
            InsufficientData::new("cloud cover"),
        );
        assert!(err.user_message().contains("no usable data"));
    }

    #[test]
    fn test_error_context_in_display() {
        let err = ReportError::data_unavailable(
            "PointLeo",
            ReportKind::Surf,
            FetchError::Status {
                status: 502,
                endpoint: "marine".to_string(),
            },
        );
        let text = err.to_string();
        assert!(text.contains("PointLeo"));
        assert!(text.contains("Surf"));
        assert!(text.contains("502"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DocumentWriteError::io("/reports/a.pdf", io_err);
        assert!(matches!(err, DocumentWriteError::Io { .. }));
        assert!(err.to_string().contains("/reports/a.pdf"));
    }
}
