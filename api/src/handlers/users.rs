use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use common::models::{Event, Organization, User, UserChanges};
use serde::{Deserialize, Serialize};

use crate::handlers::{created, ErrorResponse, SuccessResponse};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Public view of an account; the email is only included for its owner
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    fn public(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: None,
            created_at: user.created_at,
        }
    }

    fn private(user: User) -> Self {
        let email = user.email.clone();
        Self {
            email: Some(email),
            ..Self::public(user)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub deleted_organizations: Vec<i64>,
}

#[tracing::instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<UserResponse>>>, ErrorResponse> {
    let users = state.services.users.find_all().await?;
    Ok(Json(SuccessResponse::new(
        users.into_iter().map(UserResponse::public).collect(),
    )))
}

/// Register a new account
#[tracing::instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, SuccessResponse<UserResponse>), ErrorResponse> {
    let Json(req) = payload?;

    let user = state
        .services
        .users
        .register(
            req.first_name.as_deref().unwrap_or_default(),
            req.last_name.as_deref().unwrap_or_default(),
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(created(UserResponse::private(user)))
}

#[tracing::instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    caller: Option<Extension<AuthenticatedUser>>,
) -> Result<Json<SuccessResponse<UserResponse>>, ErrorResponse> {
    let Path(user_id) = path?;
    let user = state.services.users.find_by_id(user_id).await?;

    let is_owner = caller
        .map(|Extension(AuthenticatedUser(claims))| claims.user_id == user_id)
        .unwrap_or(false);

    let response = if is_owner {
        UserResponse::private(user)
    } else {
        UserResponse::public(user)
    };
    Ok(Json(SuccessResponse::new(response)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> Result<Json<SuccessResponse<UserResponse>>, ErrorResponse> {
    let Path(user_id) = path?;
    let Json(changes) = payload?;
    let user = state.services.users.update(user_id, changes).await?;
    Ok(Json(SuccessResponse::new(UserResponse::private(user))))
}

/// Delete the caller's account along with organizations left without members
#[tracing::instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<DeleteUserResponse>>, ErrorResponse> {
    let Path(user_id) = path?;
    let deleted_organizations = state.services.users.delete(user_id).await?;
    Ok(Json(SuccessResponse::new(DeleteUserResponse {
        deleted_organizations,
    })))
}

#[tracing::instrument(skip(state))]
pub async fn user_organizations(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Vec<Organization>>>, ErrorResponse> {
    let Path(user_id) = path?;
    let organizations = state.services.users.organizations_of(user_id).await?;
    Ok(Json(SuccessResponse::new(organizations)))
}

#[tracing::instrument(skip(state))]
pub async fn user_events(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Vec<Event>>>, ErrorResponse> {
    let Path(user_id) = path?;
    let events = state.services.users.events_of(user_id).await?;
    Ok(Json(SuccessResponse::new(events)))
}
