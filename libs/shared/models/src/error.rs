use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors observable at the service boundary.
///
/// `Validation` and `NotFound` are the business outcomes callers are expected
/// to handle. `Database` carries infrastructure failures (store unreachable,
/// malformed documents) that were normalised from the storage layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::ValidationError(msg),
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn service_errors_map_to_http_errors() {
        assert_matches!(
            AppError::from(ServiceError::validation("slot not available for booking")),
            AppError::ValidationError(msg) if msg == "slot not available for booking"
        );
        assert_matches!(AppError::from(ServiceError::not_found("x")), AppError::NotFound(_));
        assert_matches!(AppError::from(ServiceError::Database("down".into())), AppError::Database(_));
    }

    #[test]
    fn status_codes() {
        assert_eq!(AppError::ValidationError("v".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("n".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden("f".into()).into_response().status(), StatusCode::FORBIDDEN);
    }
}
