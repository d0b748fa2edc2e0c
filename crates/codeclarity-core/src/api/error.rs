use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Server-reported failure with a structured error body.
    #[error("API error: {0}")]
    Api(ErrorBody),

    /// Server-reported failure whose body was not structured JSON.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build the error for a response with status >= 400.
    ///
    /// A JSON object body is reported as a structured error; anything else
    /// is reported with the raw status and body text.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value::<ErrorBody>(value).ok(),
            _ => None,
        };
        match parsed {
            Some(mut parsed) => {
                parsed.status_code = status.as_u16();
                ApiError::Api(parsed)
            }
            None => ApiError::Http {
                status: status.as_u16(),
                body: body.to_string(),
            },
        }
    }

    /// HTTP status of a server-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api(body) => Some(body.status_code),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Error body: `{status_code, status, error_code?, message?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.error_code.as_deref().filter(|c| !c.is_empty());
        let message = self.message.as_deref().filter(|m| !m.is_empty());
        match (code, message) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (Some(code), None) => f.write_str(code),
            (None, Some(message)) => f.write_str(message),
            (None, None) => write!(f, "HTTP {}", self.status_code),
        }
    }
}

/// Which decode attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Whole body of a collection response
    Collection,
    /// `data` member of a single-object envelope
    Object,
    /// Body without a recognizable envelope
    Bare,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::Collection => write!(f, "paginated response"),
            DecodeStage::Object => write!(f, "response data"),
            DecodeStage::Bare => write!(f, "response"),
        }
    }
}

#[derive(Error, Debug)]
#[error("Failed to parse {stage}: {source}")]
pub struct DecodeError {
    pub stage: DecodeStage,
    #[source]
    pub source: serde_json::Error,
}
