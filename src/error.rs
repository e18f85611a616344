use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Server error ({0}): {1}")]
    Server(StatusCode, String),

    #[error("Unable to connect to the server: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Map a non-success HTTP status and the server's message onto a variant.
    /// `fallback` is used when the body carried no message.
    pub fn from_status(status: StatusCode, message: Option<String>, fallback: &str) -> Self {
        let msg = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::BadRequest(msg),
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(msg),
            StatusCode::FORBIDDEN => AppError::Forbidden(msg),
            StatusCode::NOT_FOUND => AppError::NotFound(msg),
            StatusCode::CONFLICT => AppError::Conflict(msg),
            s => AppError::Server(s, msg),
        }
    }

    /// HTTP status carried by server-side failures, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppError::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            AppError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            AppError::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            AppError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            AppError::Conflict(_) => Some(StatusCode::CONFLICT),
            AppError::Server(s, _) => Some(*s),
            _ => None,
        }
    }

    /// Text fit for display: a server message without the status prefix.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Server(_, m) => m.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// Replace the placeholder text of a server error that carried no
    /// message of its own.
    pub fn or_message(self, fallback: &str) -> Self {
        let generic = |m: &str| m.starts_with(GENERIC_FAILURE);
        match self {
            AppError::BadRequest(m) if generic(&m) => AppError::BadRequest(fallback.to_string()),
            AppError::Unauthorized(m) if generic(&m) => AppError::Unauthorized(fallback.to_string()),
            AppError::Forbidden(m) if generic(&m) => AppError::Forbidden(fallback.to_string()),
            AppError::NotFound(m) if generic(&m) => AppError::NotFound(fallback.to_string()),
            AppError::Conflict(m) if generic(&m) => AppError::Conflict(fallback.to_string()),
            AppError::Server(s, m) if generic(&m) => AppError::Server(s, fallback.to_string()),
            other => other,
        }
    }
}

/// Prefix of the message used when a failed response had no body message.
pub const GENERIC_FAILURE: &str = "Request failed with status code";

pub fn generic_failure(status: StatusCode) -> String {
    format!("{} {}", GENERIC_FAILURE, status.as_u16())
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout
        } else if err.is_decode() {
            AppError::Decode(err.to_string())
        } else if err.is_connect() || err.is_request() {
            AppError::Network(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_prefers_server_message() {
        let err = AppError::from_status(
            StatusCode::CONFLICT,
            Some("Car already booked for these dates".to_string()),
            "Booking failed",
        );
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Car already booked for these dates");
    }

    #[test]
    fn test_or_message_only_replaces_placeholder() {
        let err = AppError::from_status(StatusCode::BAD_REQUEST, None, &generic_failure(StatusCode::BAD_REQUEST));
        assert_eq!(err.or_message("Booking failed").to_string(), "Booking failed");

        let err = AppError::Conflict("Car already booked".to_string());
        assert_eq!(err.or_message("Booking failed").to_string(), "Car already booked");
    }

    #[test]
    fn test_status_mapping_uses_fallback() {
        let err = AppError::from_status(StatusCode::BAD_REQUEST, Some("  ".to_string()), "Booking failed");
        assert_eq!(err.to_string(), "Booking failed");

        let err = AppError::from_status(StatusCode::BAD_GATEWAY, None, "Booking failed");
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }
}
