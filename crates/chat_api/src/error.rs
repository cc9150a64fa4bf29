use std::fmt;

use reqwest::StatusCode;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum ChatApiError {
    MissingBearerToken,
    InvalidBaseUrl(String),
    /// Login rejected by the service. Never produced mid-stream.
    InvalidCredentials(StatusCode),
    Request(reqwest::Error),
    Status(StatusCode, String),
    /// A payload that is not valid JSON or matches neither wire shape.
    MalformedPayload(String),
    Serde(JsonError),
    Cancelled,
    Unknown(String),
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBearerToken => write!(f, "bearer token is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidCredentials(status) => {
                write!(f, "invalid credentials (HTTP {status})")
            }
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::MalformedPayload(payload) => {
                write!(f, "malformed stream payload: {payload}")
            }
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ChatApiError {}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ChatApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

impl ChatApiError {
    /// True for application-level auth rejection at login time.
    #[must_use]
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials(_))
    }

    /// True for failures that end a stream without implicating the
    /// credential: transport drops, non-2xx handshakes, and payloads
    /// outside the wire contract.
    #[must_use]
    pub fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Status(..) | Self::MalformedPayload(_)
        )
    }
}
