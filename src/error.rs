use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::WithRejection;
use diesel::result::DatabaseErrorKind;
use serde::Serialize;
use std::fmt::Display;

use crate::workflow::WorkflowError;

pub type AppResult<T> = Result<T, AppError>;

/// JSON request body whose parse failures answer as `{error}` with 400.
pub type JsonBody<T> = WithRejection<Json<T>, AppError>;

const INTERNAL_MESSAGE: &str = "internal server error";
const VALUE_TOO_LONG: &str = "value too long for type";

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn not_found_entity(entity: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{entity} not found"))
    }

    pub fn internal<E: Display>(error: E) -> Self {
        let detail = error.to_string();
        tracing::error!(error = %detail, "request failed with internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_MESSAGE.to_string(),
            detail: Some(detail),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let details = if cfg!(debug_assertions) {
            self.detail
        } else {
            None
        };
        let body = Json(ErrorResponse {
            error: self.message,
            details,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<WorkflowError> for AppError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::Forbidden => AppError::forbidden(),
            other => AppError::bad_request(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        AppError::bad_request(value.body_text())
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::bad_request("record already exists")
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                AppError::bad_request(format!(
                    "constraint violated: {}",
                    info.constraint_name().unwrap_or("check")
                ))
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::bad_request("referenced record does not exist")
            }
            // SQLSTATE 22001 has no dedicated kind in diesel.
            diesel::result::Error::DatabaseError(_, info)
                if info.message().starts_with(VALUE_TOO_LONG) =>
            {
                AppError::bad_request(match info.column_name() {
                    Some(column) => format!("{column} is too long"),
                    None => "A field value is too long".to_string(),
                })
            }
            _ => AppError::internal(value),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(value: diesel::r2d2::PoolError) -> Self {
        AppError::internal(format!("database pool error: {value}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        AppError::internal(format!("spreadsheet generation failed: {value}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        AppError::internal(format!("background query panicked: {value}"))
    }
}

/// Detects a unique-constraint violation so callers can answer with their
/// own conflict message instead of the generic one.
pub fn is_unique_violation(error: &diesel::result::Error) -> bool {
    matches!(
        error,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
