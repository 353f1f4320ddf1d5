//! API failures and the user-visible notifications they map to.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::request::{HttpResponse, TransportError};

/// Errors surfaced by any call to the service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No response was received
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session is missing, expired or revoked (HTTP 401)
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("session expired"))]
    Unauthorized { message: Option<String> },

    /// The service answered with a non-success status
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("request failed"))]
    Status { status: u16, message: Option<String> },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success response, pulling the service's own message
    /// from `{"error": ..}` or `{"message": ..}` when present.
    pub fn from_response(response: &HttpResponse) -> Self {
        let message = server_message(&response.body);
        match response.status {
            401 => ApiError::Unauthorized { message },
            status => ApiError::Status { status, message },
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the session must be cleared and the user sent to login.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The service-provided message, or `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        let message = match self {
            ApiError::Unauthorized { message } | ApiError::Status { message, .. } => {
                message.clone()
            }
            _ => None,
        };
        message.unwrap_or_else(|| fallback.to_string())
    }

    /// Transient notification shown to the user for this failure.
    pub fn notification(&self) -> Notification {
        let message = match self {
            ApiError::Transport(TransportError::Timeout(_)) => {
                "Request timed out, please try again".to_string()
            }
            ApiError::Transport(_) => {
                "Network error, please check your connection".to_string()
            }
            ApiError::Unauthorized { .. } => {
                "Your session has expired, please sign in again".to_string()
            }
            ApiError::Status { status: 403, .. } => {
                "You do not have permission to access this resource".to_string()
            }
            ApiError::Status { status: 404, .. } => {
                "The requested resource does not exist".to_string()
            }
            ApiError::Status { status: 500, .. } => {
                "Server error, please try again later".to_string()
            }
            ApiError::Status {
                status: 502..=504, ..
            } => "Service temporarily unavailable, please try again later".to_string(),
            ApiError::Status { .. } => self.message_or("Request failed"),
            ApiError::Decode(_) => "Unexpected response from the server".to_string(),
        };
        Notification {
            level: NotificationLevel::Error,
            message,
            redirect_to_login: self.requires_login(),
        }
    }
}

fn server_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// The host should navigate to the login view.
    pub redirect_to_login: bool,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            redirect_to_login: false,
        }
    }
}
