use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use concierge_core::repository::RepoError;
use concierge_core::CoreError;
use concierge_desk::DeskError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    PaymentRequired(String),
    TooManyRequests(String),
    BadGateway(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::BadGateway(msg) => {
                tracing::warn!("Upstream delivery failed: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            CoreError::InvalidTransition { .. } | CoreError::Conflict(_) => AppError::ConflictError(err.to_string()),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<DeskError> for AppError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::Domain(e) => e.into(),
            DeskError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            DeskError::Precondition(_) => AppError::ConflictError(err.to_string()),
            DeskError::Forbidden(_) => AppError::AuthorizationError(err.to_string()),
            DeskError::OutstandingBalance { .. } => AppError::PaymentRequired(err.to_string()),
            DeskError::Delivery(_) => AppError::BadGateway(err.to_string()),
            DeskError::Storage(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        DeskError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desk_errors_map_to_status_codes() {
        let cases = [
            (DeskError::NotFound("booking".into()), StatusCode::NOT_FOUND),
            (DeskError::Precondition("not confirmed".into()), StatusCode::CONFLICT),
            (DeskError::Forbidden("force".into()), StatusCode::FORBIDDEN),
            (
                DeskError::OutstandingBalance { balance: 500, currency: "EUR".into() },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (DeskError::Delivery("relay down".into()), StatusCode::BAD_GATEWAY),
            (DeskError::Domain(CoreError::ValidationError("bad".into())), StatusCode::BAD_REQUEST),
            (
                DeskError::Domain(CoreError::InvalidTransition { from: "CANCELLED".into(), to: "CONFIRMED".into() }),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_storage_error_hidden() {
        let err: RepoError = "connection reset".into();
        let response = AppError::from(DeskError::Storage(err)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_repository_conflict_is_409() {
        let err: RepoError = Box::new(CoreError::Conflict("Duplicate entry: username rosa".into()));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let err: RepoError = Box::new(CoreError::Conflict("Duplicate entry: room number 101".into()));
        let response = AppError::from(DeskError::from(err)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let err: RepoError = "connection reset".into();
        assert_eq!(AppError::from(err).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
