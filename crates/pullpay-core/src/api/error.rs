use std::fmt;

use serde_json::Value;

pub const GENERIC_SERVER_MESSAGE: &str = "Something went wrong. Please try again.";
pub const NETWORK_MESSAGE: &str =
    "Unable to reach the server. Please check your network connection and try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

const MAX_PLAIN_MESSAGE_CHARS: usize = 200;

/// Outcome category of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Unauthenticated,
    ServerError,
    NetworkError,
    InvalidResponse,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Unauthenticated => write!(f, "unauthenticated"),
            FetchErrorKind::ServerError => write!(f, "server_error"),
            FetchErrorKind::NetworkError => write!(f, "network_error"),
            FetchErrorKind::InvalidResponse => write!(f, "invalid_response"),
        }
    }
}

/// Error from a backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Missing or rejected credential. Recovered by navigating to login.
    Unauthenticated,
    /// Non-2xx, non-401 response. `message` is the server's own text, if any.
    ServerError { status: u16, message: Option<String> },
    /// The request never produced an HTTP response.
    NetworkError(String),
    /// A 2xx body that does not match the expected shape.
    InvalidResponse(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Unauthenticated => FetchErrorKind::Unauthenticated,
            FetchError::ServerError { .. } => FetchErrorKind::ServerError,
            FetchError::NetworkError(_) => FetchErrorKind::NetworkError,
            FetchError::InvalidResponse(_) => FetchErrorKind::InvalidResponse,
        }
    }

    /// Builds a server error from a status code and raw response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        FetchError::ServerError {
            status,
            message: extract_server_message(body),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, FetchError::Unauthenticated)
    }

    /// Text to show the user.
    pub fn user_message(&self) -> String {
        self.user_message_or(GENERIC_SERVER_MESSAGE)
    }

    /// Text to show the user, with a caller-chosen fallback for server
    /// errors that carry no message of their own.
    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            FetchError::Unauthenticated => SESSION_EXPIRED_MESSAGE.to_string(),
            FetchError::ServerError {
                message: Some(message),
                ..
            } => message.clone(),
            FetchError::ServerError { message: None, .. } | FetchError::InvalidResponse(_) => {
                fallback.to_string()
            }
            FetchError::NetworkError(_) => NETWORK_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Unauthenticated => write!(f, "Not authenticated"),
            FetchError::ServerError {
                status,
                message: Some(message),
            } => write!(f, "HTTP {status}: {message}"),
            FetchError::ServerError {
                status,
                message: None,
            } => write!(f, "HTTP {status}"),
            FetchError::NetworkError(details) => write!(f, "Network error: {details}"),
            FetchError::InvalidResponse(details) => write!(f, "Invalid response: {details}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Result type for backend calls.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::NetworkError(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        FetchError::NetworkError(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        FetchError::InvalidResponse(e.to_string())
    } else {
        FetchError::NetworkError(e.to_string())
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Understands Django REST framework shapes (`detail`, `non_field_errors`,
/// per-field lists) as well as `message` / `error` objects. Plain-text
/// bodies are used as-is unless they are HTML; long ones are cut at 200
/// characters.
pub fn extract_server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        if trimmed.starts_with('<') {
            return None;
        }
        return Some(truncate_message(trimmed));
    };

    message_from_json(&json)
}

fn message_from_json(json: &Value) -> Option<String> {
    match json {
        Value::String(text) => non_empty(text),
        Value::Array(items) => items.iter().find_map(message_from_json),
        Value::Object(map) => {
            for key in ["detail", "message", "error", "non_field_errors"] {
                if let Some(message) = map.get(key).and_then(message_from_json) {
                    return Some(message);
                }
            }
            // Field errors: {"amount": ["Ensure this value is greater than 0."]}
            map.iter().find_map(|(field, value)| {
                let message = match value {
                    Value::Array(_) | Value::String(_) => message_from_json(value)?,
                    _ => return None,
                };
                Some(format!("{field}: {message}"))
            })
        }
        _ => None,
    }
}

fn truncate_message(text: &str) -> String {
    match text.char_indices().nth(MAX_PLAIN_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
