// Mapping from engine errors to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use codegrade_common::EngineError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    /// Caller identity missing or malformed
    Unauthorized(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Engine(EngineError::Validation(message.into()))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Engine(err) => match err {
                EngineError::Validation(_) | EngineError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
                EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
                EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
                EngineError::ServiceUnavailable(_) | EngineError::Timeout(_) | EngineError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, message) = match &self {
            ApiError::Unauthorized(msg) => ("Unauthorized", msg.clone()),
            ApiError::Engine(err) => (err.kind(), err.to_string()),
        };

        if status.is_server_error() {
            error!(kind, error = %message, "Request failed");
        } else {
            warn!(kind, status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (EngineError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::UnsupportedLanguage("ruby".into()), StatusCode::BAD_REQUEST),
            (EngineError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (EngineError::problem_not_found("1"), StatusCode::NOT_FOUND),
            (EngineError::ServiceUnavailable("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (EngineError::Timeout(20), StatusCode::INTERNAL_SERVER_ERROR),
            (EngineError::Storage("io".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
        assert_eq!(ApiError::Unauthorized("who".into()).status(), StatusCode::UNAUTHORIZED);
    }
}
