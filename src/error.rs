use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, RuntimeErr};
use serde::Serialize;
use thiserror::Error;

use crate::entity::OrderStatus;
use crate::money::MoneyError;
use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Cart is empty.")]
    EmptyCart,

    #[error("{0}")]
    InsufficientStock(String),

    #[error("Order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Could not allocate an order number after {attempts} attempts")]
    OrderNumberGeneration { attempts: u32 },

    #[error("Invalid amount: {0}")]
    Money(#[from] MoneyError),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

// Postgres: serialization_failure, deadlock_detected, lock_not_available.
// SQLite: BUSY, LOCKED and their extended codes.
const TRANSIENT_CODES: &[&str] = &["40001", "40P01", "55P03", "5", "6", "261", "262", "517"];

impl AppError {
    /// Lock conflicts that are worth retrying the whole transaction for.
    pub fn is_transient(&self) -> bool {
        let AppError::OrmError(err) = self else {
            return false;
        };
        let runtime = match err {
            DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
            _ => return false,
        };
        let RuntimeErr::SqlxError(inner) = runtime else {
            return false;
        };
        let inner: &sqlx::Error = inner;
        match inner {
            sqlx::Error::Database(db) => db
                .code()
                .is_some_and(|code| TRANSIENT_CODES.iter().any(|known| *known == code)),
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::EmptyCart | AppError::Money(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InsufficientStock(_) | AppError::InvalidStatusTransition { .. } => {
                StatusCode::CONFLICT
            }
            AppError::OrderNumberGeneration { .. }
            | AppError::Serialization(_)
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        assert_eq!(AppError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InsufficientStock("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::OrderNumberGeneration { attempts: 10 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::EmptyCart.to_string(), "Cart is empty.");
    }

    #[test]
    fn validation_errors_are_not_transient() {
        assert!(!AppError::EmptyCart.is_transient());
        assert!(!AppError::OrmError(DbErr::RecordNotFound("x".into())).is_transient());
    }
}
