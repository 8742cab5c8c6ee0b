use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::time::Duration;

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    /// Remaining prompts, only present for QuotaExceeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i32>,
}

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No subscription found for user {0}")]
    SubscriptionNotFound(String),

    #[error("No prompts remaining ({remaining} left)")]
    QuotaExceeded { remaining: i32 },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Metered operation failed: {0}")]
    OperationFailed(String),

    #[error("Metered operation timed out after {0:?}")]
    OperationTimedOut(Duration),

    #[error("Metered operation cancelled by caller")]
    OperationCancelled,

    #[error("Usage tracker error: {0}")]
    UsageTracker(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "NotAuthenticated",
            AppError::SubscriptionNotFound(_) => "SubscriptionNotFound",
            AppError::QuotaExceeded { .. } => "QuotaExceeded",
            AppError::InvalidPlan(_) => "InvalidPlan",
            AppError::Validation(_) => "ValidationError",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::OperationFailed(_) => "OperationFailed",
            AppError::OperationTimedOut(_) => "OperationTimedOut",
            AppError::OperationCancelled => "OperationCancelled",
            AppError::UsageTracker(_) => "UsageTrackerError",
            AppError::Database(_) => "DatabaseError",
            AppError::Internal(_) => "InternalError",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::SubscriptionNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::InvalidPlan(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::OperationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::OperationTimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::OperationCancelled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UsageTracker(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let remaining = match self {
            AppError::QuotaExceeded { remaining } => Some(*remaining),
            _ => None,
        };

        let response = ErrorResponse {
            error: ErrorDetail {
                error_type: self.error_type().to_string(),
                message: self.to_string(),
                remaining,
            },
        };

        HttpResponse::build(self.status_code()).json(response)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
