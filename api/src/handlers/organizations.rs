use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    Extension, Json,
};
use common::errors::ValidationError;
use common::models::{Event, Organization, OrganizationChanges, RemoveMemberOutcome};
use serde::Deserialize;

use crate::handlers::{created, ErrorResponse, SuccessResponse};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Option<i64>,
}

#[tracing::instrument(skip(state))]
pub async fn list_organizations(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<Organization>>>, ErrorResponse> {
    let organizations = state.services.organizations.find_all().await?;
    Ok(Json(SuccessResponse::new(organizations)))
}

/// Create an organization with the caller as its first member
#[tracing::instrument(skip_all, fields(user_id = claims.user_id))]
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateOrganizationRequest>, JsonRejection>,
) -> Result<(StatusCode, SuccessResponse<Organization>), ErrorResponse> {
    let Json(req) = payload?;

    let organization = state
        .services
        .organizations
        .create(
            claims.user_id,
            req.name.as_deref().unwrap_or_default(),
            req.description.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(created(organization))
}

#[tracing::instrument(skip(state))]
pub async fn get_organization(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Organization>>, ErrorResponse> {
    let Path(id) = path?;
    let organization = state.services.organizations.find_by_id(id).await?;
    Ok(Json(SuccessResponse::new(organization)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_organization(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<OrganizationChanges>, JsonRejection>,
) -> Result<Json<SuccessResponse<Organization>>, ErrorResponse> {
    let Path(id) = path?;
    let Json(changes) = payload?;
    let organization = state.services.organizations.update(id, changes).await?;
    Ok(Json(SuccessResponse::new(organization)))
}

/// Delete an organization and, through cascades, its events
#[tracing::instrument(skip(state))]
pub async fn delete_organization(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ErrorResponse> {
    let Path(id) = path?;
    state.services.organizations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Vec<i64>>>, ErrorResponse> {
    let Path(id) = path?;
    let members = state.services.organizations.member_ids(id).await?;
    Ok(Json(SuccessResponse::new(members)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn add_member(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, SuccessResponse<Vec<i64>>), ErrorResponse> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let user_id = req
        .user_id
        .ok_or_else(|| ValidationError::MissingField("userId".to_string()))?;

    state.services.organizations.add_member(id, user_id).await?;
    let members = state.services.organizations.member_ids(id).await?;
    Ok(created(members))
}

/// Remove a member; removing the last one deletes the organization
#[tracing::instrument(skip(state))]
pub async fn remove_member(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<SuccessResponse<RemoveMemberOutcome>>, ErrorResponse> {
    let Path((id, user_id)) = path?;
    let outcome = state
        .services
        .organizations
        .remove_member(id, user_id)
        .await?;
    Ok(Json(SuccessResponse::new(outcome)))
}

#[tracing::instrument(skip(state))]
pub async fn organization_events(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Vec<Event>>>, ErrorResponse> {
    let Path(id) = path?;
    let events = state.services.organizations.events(id).await?;
    Ok(Json(SuccessResponse::new(events)))
}
