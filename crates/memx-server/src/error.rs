use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing or invalid session token")]
    Unauthenticated,

    #[error("admin access required")]
    AdminRequired,

    #[error("request does not belong to the caller")]
    NotRequestOwner,

    #[error("business not found")]
    BusinessNotFound,

    #[error("request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("request history not found: {0}")]
    HistoryNotFound(Uuid),

    #[error("signup request not found: {0}")]
    SignupNotFound(Uuid),

    #[error("mailing address not set")]
    MailingAddressNotSet,

    #[error("request is already closed: {0}")]
    RequestClosed(Uuid),

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("identity provider error: {0}")]
    Identity(String),

    #[error("payment provider error: {0}")]
    Payments(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::AdminRequired => (StatusCode::FORBIDDEN, "admin_required"),
            Self::NotRequestOwner => (StatusCode::FORBIDDEN, "not_request_owner"),
            Self::BusinessNotFound => (StatusCode::NOT_FOUND, "business_not_found"),
            Self::RequestNotFound(_) => (StatusCode::NOT_FOUND, "request_not_found"),
            Self::HistoryNotFound(_) => (StatusCode::NOT_FOUND, "history_not_found"),
            Self::SignupNotFound(_) => (StatusCode::NOT_FOUND, "signup_not_found"),
            Self::MailingAddressNotSet => (StatusCode::NOT_FOUND, "mailing_address_not_set"),
            Self::RequestClosed(_) => (StatusCode::CONFLICT, "request_closed"),
            Self::InvalidSignature => (StatusCode::BAD_REQUEST, "invalid_signature"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Identity(_) => (StatusCode::INTERNAL_SERVER_ERROR, "identity_error"),
            Self::Payments(_) => (StatusCode::INTERNAL_SERVER_ERROR, "payment_error"),
            Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            Self::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let message = if status.is_server_error() {
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
