use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidPrice(_)
            | LedgerError::Validation(_)
            | LedgerError::BelowMinimum { .. } => AppError::Validation(e.to_string()),
            LedgerError::NotFound(what) => AppError::NotFound(what.to_string()),
            LedgerError::InsufficientSupply { .. }
            | LedgerError::InsufficientHoldings { .. }
            | LedgerError::AlreadyCancelled
            | LedgerError::AlreadyDistributed
            | LedgerError::InvalidState(_) => AppError::Conflict(e.to_string()),
            LedgerError::Storage(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn status_of(e: LedgerError) -> StatusCode {
        AppError::from(e).status()
    }

    #[test]
    fn test_validation_errors_map_to_400() {
        assert_eq!(status_of(LedgerError::InvalidAmount(0)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LedgerError::InvalidPrice(Decimal::ZERO)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(LedgerError::BelowMinimum { requested: 5, minimum: 10 }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflicts_map_to_409() {
        assert_eq!(
            status_of(LedgerError::InsufficientSupply { requested: 10, available: 5 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(LedgerError::AlreadyCancelled), StatusCode::CONFLICT);
        assert_eq!(status_of(LedgerError::AlreadyDistributed), StatusCode::CONFLICT);
        assert_eq!(status_of(LedgerError::InvalidState("filled".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_and_storage() {
        assert_eq!(status_of(LedgerError::NotFound("order")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(LedgerError::Storage(sqlx::Error::PoolTimedOut)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let response = AppError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
