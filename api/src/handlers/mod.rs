pub mod auth;
pub mod events;
pub mod health;
pub mod metrics;
pub mod organizations;
pub mod users;

// Common response types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::errors::{
    AuthError, DatabaseError, EventError, OrganizationError, UserError, ValidationError,
};
use serde::Serialize;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub trace_id: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn internal(error: &dyn std::fmt::Display) -> Self {
        let response = Self::new("internal_error", "Internal server error");
        tracing::error!(error = %error, trace_id = %response.trace_id, "Request failed");
        response
    }

    fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ValidationError> for ErrorResponse {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        ErrorResponse::new("validation_error", err.to_string())
            .with_details(serde_json::json!({ "field": field }))
    }
}

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        ErrorResponse::new("validation_error", rejection.body_text())
    }
}

impl From<QueryRejection> for ErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        ErrorResponse::new("validation_error", rejection.body_text())
    }
}

impl From<PathRejection> for ErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        ErrorResponse::new("validation_error", rejection.body_text())
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        match err.status() {
            StatusCode::UNAUTHORIZED => ErrorResponse::new("unauthorized", err.to_string()),
            _ => ErrorResponse::internal(&err),
        }
    }
}

impl From<DatabaseError> for ErrorResponse {
    fn from(err: DatabaseError) -> Self {
        ErrorResponse::internal(&err)
    }
}

impl From<UserError> for ErrorResponse {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => ErrorResponse::new("not_found", err.to_string()),
            UserError::EmailTaken(_) => {
                ErrorResponse::new("conflict", "This email address is already registered")
            }
            UserError::Validation(err) => err.into(),
            UserError::Hashing(_) | UserError::Database(_) => ErrorResponse::internal(&err),
        }
    }
}

impl From<OrganizationError> for ErrorResponse {
    fn from(err: OrganizationError) -> Self {
        match err {
            OrganizationError::NotFound(_)
            | OrganizationError::UserNotFound(_)
            | OrganizationError::NotMember { .. } => {
                ErrorResponse::new("not_found", err.to_string())
            }
            OrganizationError::AlreadyMember { .. } => {
                ErrorResponse::new("conflict", err.to_string())
            }
            OrganizationError::Validation(err) => err.into(),
            OrganizationError::Database(_) => ErrorResponse::internal(&err),
        }
    }
}

impl From<EventError> for ErrorResponse {
    fn from(err: EventError) -> Self {
        match err {
            EventError::NotFound(_)
            | EventError::UserNotFound(_)
            | EventError::NotParticipating { .. } => {
                ErrorResponse::new("not_found", err.to_string())
            }
            EventError::UnknownOrganization(_) => {
                ErrorResponse::new("validation_error", err.to_string())
                    .with_details(serde_json::json!({ "field": "organizationId" }))
            }
            EventError::Full { .. } | EventError::AlreadyParticipating { .. } => {
                ErrorResponse::new("conflict", err.to_string())
            }
            EventError::Validation(err) => err.into(),
            EventError::Database(_) => ErrorResponse::internal(&err),
        }
    }
}

/// Standard API success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `201 Created` with the standard envelope
pub fn created<T: Serialize>(data: T) -> (StatusCode, SuccessResponse<T>) {
    (StatusCode::CREATED, SuccessResponse::new(data))
}
