use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input: zero/negative quantity, missing address field,
    /// past delivery date, unknown filter field. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not Found")]
    NotFound,

    /// Removal quantity greater than the held quantity.
    #[error("cannot remove {requested} units, the cart holds {held}")]
    QuantityExceeded { requested: i32, held: i32 },

    #[error("ordering 0 products is not permitted")]
    EmptyCart,

    /// The gateway declined or errored; its message is kept, not replaced.
    /// The order is marked failed and the cart is preserved for a retry.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidArgument(_) | AppError::EmptyCart => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::QuantityExceeded { .. } => StatusCode::CONFLICT,
            AppError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
