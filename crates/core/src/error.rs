//! Error taxonomy for remote calls and the stores built on them.

use thiserror::Error;

use crate::models::HoldingId;

/// Failure of a single remote API call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The server rejected the session cookie (401/403).
    #[error("not authorized (HTTP {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Message from the server's `{"error": ...}` body; empty when absent.
        message: String,
    },
    /// The addressed resource does not exist.
    #[error("not found")]
    NotFound,
    /// Any other non-success status.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the server's `{"error": ...}` body, or the raw body.
        message: String,
    },
    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(String),
    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP status together with its body.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized {
                status,
                message: server_message(body).unwrap_or_default(),
            },
            404 => ApiError::NotFound,
            _ => ApiError::Rejected {
                status,
                message: server_message(body).unwrap_or_else(|| body.trim().to_string()),
            },
        }
    }

    /// Returns `true` when the server considers the session expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Message the server attached to a rejection, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message, .. } | ApiError::Rejected { message, .. }
                if !message.is_empty() =>
            {
                Some(message)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|message| message.as_str())
        .map(|message| message.to_string())
}

/// Failure of login, logout or registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// The form was rejected before any call was made.
    #[error("{0}")]
    InvalidInput(String),
    /// The remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Text suitable for a notification.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::InvalidInput(reason) => reason.clone(),
            AuthError::Api(err) => err
                .server_message()
                .map(|message| message.to_string())
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// Failure to fetch holdings or reference data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl LoadError {
    /// Returns `true` when the server considers the session expired.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            LoadError::Api(err) => err.is_unauthorized(),
        }
    }
}

/// Failure to create or update a holding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    /// The payload failed client-side validation; nothing was sent.
    #[error("invalid holding: {0}")]
    Invalid(String),
    /// The server accepted an update for a holding no longer in the list.
    #[error("holding {0} is no longer in the list")]
    TargetNotFound(HoldingId),
    /// The remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SaveError {
    /// Returns `true` when the server considers the session expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SaveError::Api(err) if err.is_unauthorized())
    }
}

/// Failure to delete a holding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeleteError {
    /// The remote call failed, including a target the server no longer has.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DeleteError {
    /// Returns `true` when the server considers the session expired.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            DeleteError::Api(err) => err.is_unauthorized(),
        }
    }
}
