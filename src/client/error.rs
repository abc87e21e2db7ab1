use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::Deserialize;

/// Failures seen by the client side.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("server responded with {status}")]
    Api {
        status: StatusCode,
        /// The `message` field of the error body, when there was one.
        message: Option<String>,
        /// Per-field validation messages of a 422.
        errors: BTreeMap<String, Vec<String>>,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("invalid base url: {0}")]
    Url(String),
}

impl ClientError {
    /// The message the server put in the error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            ClientError::Api { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }

    /// Builds an `Api` error from a status and the raw response body. Bodies that are
    /// not the usual `{"message": ..}` JSON leave `message` empty.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize, Default)]
        struct ErrorBody {
            message: Option<String>,
            #[serde(default)]
            errors: BTreeMap<String, Vec<String>>,
        }

        let body: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        ClientError::Api {
            status,
            message: body.message.filter(|m| !m.is_empty()),
            errors: body.errors,
        }
    }
}
