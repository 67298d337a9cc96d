//! Proxy error types and their HTTP rendering.

use crate::types::ApiError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid Authorization header format")]
    InvalidAuthorization,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Failed to marshal request for Claude API")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to call Claude API")]
    Upstream(#[source] reqwest::Error),

    #[error("Failed to read response from Claude API")]
    ReadUpstream(#[source] reqwest::Error),

    #[error("Failed to parse response from Claude API")]
    ParseUpstream(#[source] serde_json::Error),

    #[error("Claude API error ({status}): {}", .error.message)]
    Claude { status: u16, error: ApiError },

    /// Non-2xx reply without a Claude error envelope (e.g. a gateway's HTML page).
    #[error("Claude API returned status {status}")]
    UpstreamStatus { status: u16, body: String },
}

impl ResponseError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAuthorization | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Claude { status, .. } | Self::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Encode(_) | Self::Upstream(_) | Self::ReadUpstream(_) | Self::ParseUpstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Claude { error, .. } => json!({ "error": error }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(
            ProxyError::InvalidAuthorization.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn claude_errors_keep_upstream_status() {
        let err = ProxyError::Claude {
            status: 429,
            error: ApiError {
                kind: "rate_limit_error".into(),
                message: "slow down".into(),
            },
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Claude API error (429): slow down");
    }

    #[test]
    fn invalid_upstream_status_falls_back_to_bad_gateway() {
        let err = ProxyError::Claude {
            status: 1000,
            error: ApiError {
                kind: "api_error".into(),
                message: "?".into(),
            },
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn non_envelope_upstream_errors_keep_status() {
        let err = ProxyError::UpstreamStatus {
            status: 502,
            body: "<html>Bad Gateway</html>".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Claude API returned status 502");
    }

    #[test]
    fn parse_failures_are_internal_errors() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProxyError::ParseUpstream(source);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to parse response from Claude API");
    }
}
