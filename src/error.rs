use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level failures. Form validation problems are not errors: they are
/// rendered back with the form.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("member {0} not found")]
    MemberNotFound(i64),

    #[error("{0}")]
    NotFound(String),

    /// A write referenced an id (topic, language, user, product) that does not exist.
    #[error("unknown {kind} id {id}")]
    UnknownReference { kind: &'static str, id: i64 },

    /// A stored row points at something that is gone.
    #[error("{kind} {id} referenced by stored data does not exist")]
    DanglingReference { kind: &'static str, id: i64 },

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid {field} id {value:?}")]
    InvalidId { field: &'static str, value: String },

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("constraint violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MemberNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnknownReference { .. }
            | AppError::InvalidDate(_)
            | AppError::InvalidId { .. }
            | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::Integrity(_) => StatusCode::CONFLICT,
            AppError::DanglingReference { .. } | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps driver errors that represent constraint violations onto `Integrity`.
    pub fn from_db(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                AppError::Integrity(db.message().to_string())
            }
            _ => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            StatusCode::CONFLICT => {
                error!(error = %self, "constraint violation");
                "Request conflicts with stored data".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::MemberNotFound(3).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::UnknownReference { kind: "topic", id: 9 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DanglingReference { kind: "language", id: 1 }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Integrity("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidDate("2023-13-01".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn messages_name_the_offending_value() {
        let msg = AppError::UnknownReference { kind: "topic", id: 42 }.to_string();
        assert_eq!(msg, "unknown topic id 42");
        assert_eq!(AppError::MissingField("email").to_string(), "missing field: email");
    }
}
