// Error handling framework

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Authentication and authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    MissingToken,

    #[error("Invalid email/password combination")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFieldValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::InvalidFieldValue { field, .. } => field,
        }
    }
}

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate key violation: {0}")]
    DuplicateKey(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// User service errors
#[derive(Error, Debug)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Email already in use: {0}")]
    EmailTaken(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Organization service errors
#[derive(Error, Debug)]
pub enum OrganizationError {
    #[error("Organization not found: {0}")]
    NotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("User {user_id} is already a member of organization {organization_id}")]
    AlreadyMember { organization_id: i64, user_id: i64 },

    #[error("User {user_id} is not a member of organization {organization_id}")]
    NotMember { organization_id: i64, user_id: i64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Event service errors
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Event not found: {0}")]
    NotFound(i64),

    #[error("Unknown organization: {0}")]
    UnknownOrganization(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Event {event_id} is full ({max_participants} participants)")]
    Full {
        event_id: i64,
        max_participants: i32,
    },

    #[error("User {user_id} already participates in event {event_id}")]
    AlreadyParticipating { event_id: i64, user_id: i64 },

    #[error("User {user_id} does not participate in event {event_id}")]
    NotParticipating { event_id: i64, user_id: i64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// Implement From for common external errors
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Check for specific database error codes
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateKey(db_err.message().to_string()),
                        "23503" => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                        "23514" => DatabaseError::CheckViolation(db_err.message().to_string()),
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed(err.to_string())
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(err.to_string())
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::Hashing(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "unauthorized",
            _ => "internal_error",
        }
    }
}

/// Rejections raised by the authorization middleware chain
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Authentication error");
        } else {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        }

        let message = match &self {
            AuthError::Hashing(_) | AuthError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::invalid("name", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid field value for name: must not be empty"
        );
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn test_event_full_display() {
        let err = EventError::Full {
            event_id: 4,
            max_participants: 10,
        };
        assert!(err.to_string().contains("10 participants"));
    }

    #[test]
    fn test_validation_wraps_transparently() {
        let err: OrganizationError = ValidationError::MissingField("name".to_string()).into();
        assert_eq!(err.to_string(), "Missing required field: name");
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::Internal("db down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
