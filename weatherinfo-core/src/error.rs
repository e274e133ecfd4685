//! Error taxonomy for the fetch pipeline.
//!
//! None of these reach the UI directly: the orchestrator turns location and
//! network errors into a cache fallback plus a [`FailureNotice`], and storage
//! errors are logged and swallowed.
//!
//! [`FailureNotice`]: crate::model::FailureNotice

use std::{path::PathBuf, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

/// Remote call failures, classified by what a caller could do about them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Timeouts, refused connections, rate limits, 5xx. Worth retrying later.
    #[error("Network temporarily unavailable: {0}")]
    Transient(String),

    /// The service rejected our credentials.
    #[error("Request rejected by the weather service: {0}")]
    Permission(String),

    #[error("Unexpected response from the weather service: {0}")]
    Unknown(String),
}

impl NetworkError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = format!("status {}: {}", status, truncate_body(body));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Permission(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                Self::Transient(message)
            }
            s if s.is_server_error() => Self::Transient(message),
            _ => Self::Unknown(message),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, "");
        }

        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transient(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

/// Every way a location request can come back without coordinates.
///
/// All variants are "location unavailable" to the orchestrator; the variant
/// only changes the wording of the notice.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("Location unavailable: permission denied")]
    PermissionDenied,

    #[error("Location unavailable: current position is unknown")]
    PositionUnknown,

    #[error("Location unavailable: no fix received within {0:?}")]
    Timeout(Duration),

    #[error("Location unavailable: no place named '{0}' was found")]
    PlaceNotFound(String),

    #[error("Location unavailable: invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Location unavailable: geocoding failed: {0}")]
    Geocoding(#[from] NetworkError),
}

/// Local record store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read cached weather at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cached weather at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cached weather at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Shorten a response body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
