use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use common::errors::ValidationError;
use common::models::{Event, EventChanges, NewEvent};
use serde::{Deserialize, Serialize};

use crate::handlers::{created, ErrorResponse, SuccessResponse};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub organization_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub beginning: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub max_participants: Option<i32>,
    pub organization_id: Option<i64>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingField(field.to_string()))
}

#[derive(Debug, Serialize)]
pub struct ParticipationResponse {
    pub participants: i64,
}

/// List events, optionally narrowed to one organization or one participant
#[tracing::instrument(skip(state, filter))]
pub async fn list_events(
    State(state): State<AppState>,
    filter: Result<Query<EventFilter>, QueryRejection>,
) -> Result<Json<SuccessResponse<Vec<Event>>>, ErrorResponse> {
    let Query(filter) = filter?;

    let events = match (filter.organization_id, filter.user_id) {
        (Some(_), Some(_)) => {
            return Err(ErrorResponse::new(
                "validation_error",
                "Filter by organizationId or userId, not both",
            ))
        }
        (Some(organization_id), None) => {
            state.services.events.for_organization(organization_id).await?
        }
        (None, Some(user_id)) => state.services.events.for_user(user_id).await?,
        (None, None) => state.services.events.find_all().await?,
    };
    Ok(Json(SuccessResponse::new(events)))
}

/// Create an event in an organization the caller belongs to
#[tracing::instrument(skip(state, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, SuccessResponse<Event>), ErrorResponse> {
    let Json(req) = payload?;

    let draft = NewEvent {
        name: req.name.unwrap_or_default(),
        description: req.description.unwrap_or_default(),
        beginning: required(req.beginning, "beginning")?,
        end: required(req.end, "end")?,
        max_participants: required(req.max_participants, "maxParticipants")?,
        organization_id: required(req.organization_id, "organizationId")?,
    };

    let event = state.services.events.create(draft).await?;
    Ok(created(event))
}

#[tracing::instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Event>>, ErrorResponse> {
    let Path(id) = path?;
    let event = state.services.events.find_by_id(id).await?;
    Ok(Json(SuccessResponse::new(event)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EventChanges>, JsonRejection>,
) -> Result<Json<SuccessResponse<Event>>, ErrorResponse> {
    let Path(id) = path?;
    let Json(changes) = payload?;
    let event = state.services.events.update(id, changes).await?;
    Ok(Json(SuccessResponse::new(event)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ErrorResponse> {
    let Path(id) = path?;
    state.services.events.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
pub async fn list_participants(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse<Vec<i64>>>, ErrorResponse> {
    let Path(id) = path?;
    let participants = state.services.events.participant_ids(id).await?;
    Ok(Json(SuccessResponse::new(participants)))
}

/// Register the caller, subject to the event's capacity
#[tracing::instrument(skip(state, claims), fields(user_id = claims.user_id))]
pub async fn join_event(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> Result<(StatusCode, SuccessResponse<ParticipationResponse>), ErrorResponse> {
    let Path(id) = path?;
    let participants = state.services.events.join(id, claims.user_id).await?;
    Ok(created(ParticipationResponse { participants }))
}

#[tracing::instrument(skip(state))]
pub async fn leave_event(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<StatusCode, ErrorResponse> {
    let Path((id, user_id)) = path?;
    state.services.events.leave(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
