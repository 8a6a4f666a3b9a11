use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ApiResponse;

/// One short line of a hard stock check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortage {
    pub sku_id: Uuid,
    pub available: i64,
    pub requested: i64,
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sku {} available={} requested={}",
            self.sku_id, self.available, self.requested
        )
    }
}

fn join_shortages(lines: &[StockShortage]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Date violation: {0}")]
    DateViolation(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Capacity violation: {0}")]
    CapacityViolation(String),

    #[error("Hierarchy violation: {0}")]
    HierarchyViolation(String),

    #[error("Insufficient stock: {}", join_shortages(.0))]
    InsufficientStock(Vec<StockShortage>),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn db_error(error: DbErr) -> Self {
        ServiceError::DatabaseError(error)
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::DateViolation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PreconditionFailed(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::CapacityViolation(_)
            | Self::HierarchyViolation(_)
            | Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => "unexpected_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::DateViolation(_) => "date_violation",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::CapacityViolation(_) => "capacity_violation",
            Self::HierarchyViolation(_) => "hierarchy_violation",
            Self::InsufficientStock(_) => "insufficient_stock",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => "Unexpected error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Per-line details; only stock shortages carry any.
    pub fn details(&self) -> Option<Vec<String>> {
        match self {
            Self::InsufficientStock(lines) => {
                Some(lines.iter().map(ToString::to_string).collect())
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiResponse::<()>::failure(self.code(), self.response_message(), self.details());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[case(ServiceError::ValidationError("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::DateViolation("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED)]
    #[case(ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN)]
    #[case(ServiceError::PreconditionFailed("x".into()), StatusCode::CONFLICT)]
    #[case(ServiceError::InvalidTransition("x".into()), StatusCode::CONFLICT)]
    #[case(ServiceError::CapacityViolation("x".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ServiceError::HierarchyViolation("x".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ServiceError::InsufficientStock(vec![]), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ServiceError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_code_mapping(#[case] error: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("connection reset".into()));
        assert_eq!(err.response_message(), "Unexpected error");
        assert_eq!(
            ServiceError::NotFound("Location abc".into()).response_message(),
            "Not found: Location abc"
        );
    }

    #[test]
    fn shortage_message_lists_every_line() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let err = ServiceError::InsufficientStock(vec![
            StockShortage { sku_id: a, available: 30, requested: 50 },
            StockShortage { sku_id: b, available: 0, requested: 1 },
        ]);
        let message = err.to_string();
        assert!(message.contains(&format!("sku {a} available=30 requested=50")));
        assert!(message.contains(&format!("sku {b} available=0 requested=1")));
        assert_eq!(err.details().map(|d| d.len()), Some(2));
    }

    #[tokio::test]
    async fn error_response_uses_envelope() {
        let response = ServiceError::Forbidden("not the creator".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["code"], "forbidden");
        assert_eq!(payload["message"], "Forbidden: not the creator");
    }
}
