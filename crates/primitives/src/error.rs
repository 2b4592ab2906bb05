use axum::response::{IntoResponse, Response};
use diesel::r2d2;
use diesel::result::DatabaseErrorKind;
use http::StatusCode;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    Database(diesel::result::Error),
    DatabaseConnection(String),
    Validation(validator::ValidationErrors),
    BadRequest(String),
    /// Inbound payload failed authenticity checks; never persisted.
    Signature(String),
    NotFound(String),
    Conflict(String),
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    /// A value read back from the store did not have the expected shape.
    Aggregate(String),
    Rail(String),
    Internal(String),
}

impl ApiError {
    pub fn illegal_transition(
        entity: &'static str,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        ApiError::IllegalTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            ApiError::Database(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Database(e) => write!(f, "Database error: {}", e),
            ApiError::DatabaseConnection(e) => write!(f, "Database connection error: {}", e),
            ApiError::Validation(e) => write!(f, "Validation error: {}", e),
            ApiError::BadRequest(e) => write!(f, "Bad request: {}", e),
            ApiError::Signature(e) => write!(f, "Signature error: {}", e),
            ApiError::NotFound(e) => write!(f, "Not found: {}", e),
            ApiError::Conflict(e) => write!(f, "Conflict: {}", e),
            ApiError::IllegalTransition { entity, from, to } => {
                write!(f, "Illegal {} transition: {} -> {}", entity, from, to)
            }
            ApiError::Aggregate(e) => write!(f, "Aggregate type mismatch: {}", e),
            ApiError::Rail(e) => write!(f, "Transfer rail error: {}", e),
            ApiError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Database(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> Self {
        ApiError::DatabaseConnection(err.to_string())
    }
}

impl From<r2d2::PoolError> for ApiError {
    fn from(err: r2d2::PoolError) -> Self {
        ApiError::DatabaseConnection(err.to_string())
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::Database(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("Serialization failed: {}", err))
    }
}

impl From<ApiError> for (StatusCode, String) {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Database(e) => match e {
                diesel::result::Error::NotFound => {
                    (StatusCode::NOT_FOUND, "Record not found".to_string())
                }
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    (StatusCode::CONFLICT, format!("Database error: {}", e))
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", e),
                ),
            },
            ApiError::DatabaseConnection(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Database connection error: {}", e),
            ),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                format!("Validation error: {}", errors),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Signature(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Webhook rejected: {}", msg),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            e @ ApiError::IllegalTransition { .. } => (StatusCode::CONFLICT, e.to_string()),
            ApiError::Aggregate(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Aggregate type mismatch: {}", msg),
            ),
            ApiError::Rail(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Transfer rail error: {}", msg),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", msg),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::IllegalTransition { .. } | ApiError::Aggregate(_)) {
            tracing::error!(error = %self, "integrity error surfaced to caller");
        }
        let (status, body): (StatusCode, String) = self.into();
        (status, body).into_response()
    }
}
