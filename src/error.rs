// src/error.rs
use std::path::PathBuf;

use reqwest::StatusCode;
use serde::Deserialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by every runner operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{}", api_message(.status, .error, .body))]
    Api {
        status: StatusCode,
        /// Parsed vendor error object, when the body carried one.
        error: Option<ApiErrorBody>,
        body: String,
    },

    #[error("decoding response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("encoding request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("reading credentials at {}: {source}", .path.display())]
    CredentialsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing credentials at {}: {source}", .path.display())]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no config directory for this platform")]
    NoConfigDir,
}

/// PagerDuty error object: `{"error": {"code": .., "message": .., "errors": [..]}}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

impl Error {
    /// Build an `Api` error from a non-success status and the raw body.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let error = serde_json::from_slice::<ApiErrorEnvelope>(body)
            .ok()
            .map(|e| e.error);
        Error::Api {
            status,
            error,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// HTTP status behind an `Api` error, or a `Transport` error that carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Transport(e) => e.status(),
            _ => None,
        }
    }
}

fn api_message(status: &StatusCode, error: &Option<ApiErrorBody>, body: &str) -> String {
    match error {
        Some(ApiErrorBody { message: Some(msg), errors, .. }) if !errors.is_empty() => {
            format!("api error {status}: {msg} ({})", errors.join("; "))
        }
        Some(ApiErrorBody { message: Some(msg), .. }) => format!("api error {status}: {msg}"),
        _ if body.is_empty() => format!("api error {status}"),
        _ => format!("api error {status}: {body}"),
    }
}
