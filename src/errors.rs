use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Every failure a handler can report. All but `Internal` are the client's fault.
#[derive(Debug, Display)]
pub enum AppError {
    /// malformed or missing input
    #[display(fmt = "{}", _0)]
    Validation(String),
    /// a foreign key points at nothing
    #[display(fmt = "{}", _0)]
    Reference(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    /// leave request is no longer pending
    #[display(fmt = "{}", _0)]
    InvalidStateTransition(String),
    /// delete blocked by dependent rows
    #[display(fmt = "{}", _0)]
    ReferentialIntegrity(String),
    /// detail is logged, never sent
    #[display(fmt = "Internal Server Error")]
    Internal(String),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "NOT_FOUND",
    "message": "Leave request with ID 7 not found"
}))]
pub struct ErrorBody {
    /// machine readable reason
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Reference(_) => "REFERENCE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::ReferentialIntegrity(_) => "REFERENTIAL_INTEGRITY",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Maps a unique-constraint violation to a validation error carrying `message`.
    pub fn unique_or(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Validation(message.into())
            }
            _ => err.into(),
        }
    }

    /// Maps a foreign-key violation raised by a DELETE to a referential integrity error.
    pub fn dependents_or(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::ReferentialIntegrity(message.into())
            }
            _ => err.into(),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Reference(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStateTransition(_) | AppError::ReferentialIntegrity(_) => {
                StatusCode::CONFLICT
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = self {
            tracing::error!(error = %detail, "Request failed");
        }

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Validation("Record already exists".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::Reference("Referenced record does not exist".to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}
