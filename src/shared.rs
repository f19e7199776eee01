use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::session::{errors::SessionError, service::SessionService};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
    pub refresh_cookie_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(session_service: Arc<SessionService>, refresh_cookie_ttl: chrono::Duration) -> Self {
        Self {
            session_service,
            refresh_cookie_ttl,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthorized(msg) => AppError::Unauthorized(msg),
            SessionError::InvalidClaims(msg) => AppError::UnprocessableEntity(msg),
            SessionError::Signing(msg) => AppError::Forbidden(msg),
            SessionError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Session store unavailable, try again later".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_status_mapping() {
        let cases = [
            (SessionError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (SessionError::InvalidClaims("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (SessionError::Signing("x".into()), StatusCode::FORBIDDEN),
            (SessionError::StoreUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
