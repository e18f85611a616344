use std::time::Duration;

use reqwest::{Method, StatusCode};

use super::auth::Audience;

pub fn log_request(method: &Method, path: &str, audience: Audience, authenticated: bool) {
    tracing::debug!(
        method = %method,
        path = %path,
        audience = %audience,
        authenticated,
        "Outgoing request"
    );
}

/// Log a completed exchange; failures at warn, everything else at debug.
pub fn log_response(method: &Method, path: &str, audience: Audience, status: StatusCode, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;

    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!(
            method = %method,
            path = %path,
            audience = %audience,
            status = %status,
            elapsed_ms,
            "UNAUTHORIZED - token rejected"
        );
    } else if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            audience = %audience,
            status = %status,
            elapsed_ms,
            "Request failed"
        );
    } else {
        tracing::debug!(
            method = %method,
            path = %path,
            audience = %audience,
            status = %status,
            elapsed_ms,
            "Request completed"
        );
    }
}

pub fn log_transport_error(method: &Method, path: &str, audience: Audience, error: &reqwest::Error) {
    tracing::warn!(
        method = %method,
        path = %path,
        audience = %audience,
        timeout = error.is_timeout(),
        error = %error,
        "Request did not complete"
    );
}
