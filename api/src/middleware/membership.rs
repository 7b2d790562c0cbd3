use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    extract::{rejection::PathRejection, Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AuthenticatedUser;
use crate::handlers::ErrorResponse;
use crate::state::AppState;

/// Largest JSON body buffered to look up `organizationId`
const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;

pub(super) fn caller_id(request: &Request) -> Result<i64, ErrorResponse> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|AuthenticatedUser(claims)| claims.user_id)
        .ok_or_else(|| ErrorResponse::new("unauthorized", "Unauthorized"))
}

pub(super) fn id_param(
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    name: &str,
) -> Result<i64, ErrorResponse> {
    let Path(params) = params?;
    params
        .get(name)
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or_else(|| {
            ErrorResponse::new("validation_error", format!("Invalid path parameter: {}", name))
        })
}

/// Pull `organizationId` out of a JSON body; numeric strings are accepted
fn organization_id_from_body(body: &[u8]) -> Result<i64, ErrorResponse> {
    let invalid = || {
        ErrorResponse::new("validation_error", "A numeric organizationId is required")
            .with_details(serde_json::json!({ "field": "organizationId" }))
    };

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| invalid())?;
    match value.get("organizationId") {
        Some(serde_json::Value::Number(n)) => n.as_i64().ok_or_else(invalid),
        Some(serde_json::Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

async fn ensure_member(
    state: &AppState,
    organization_id: i64,
    user_id: i64,
) -> Result<(), ErrorResponse> {
    let organizations = &state.services.organizations;

    // 404 before 403 so an unknown organization is reported as such
    organizations.find_by_id(organization_id).await?;

    if !organizations.is_member(organization_id, user_id).await? {
        tracing::warn!(organization_id, user_id, "Caller is not a member of the organization");
        return Err(ErrorResponse::new(
            "forbidden",
            "You must be a member of this organization",
        ));
    }
    Ok(())
}

/// Membership check on the organization named by the `:id` path parameter
#[tracing::instrument(skip_all)]
pub async fn require_organization_member(
    State(state): State<AppState>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let user_id = caller_id(&request)?;
    let organization_id = id_param(params, "id")?;

    ensure_member(&state, organization_id, user_id).await?;
    Ok(next.run(request).await)
}

/// Membership check on the organization owning the event in `:id`
#[tracing::instrument(skip_all)]
pub async fn require_event_organization_member(
    State(state): State<AppState>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let user_id = caller_id(&request)?;
    let event_id = id_param(params, "id")?;

    let event = state.services.events.find_by_id(event_id).await?;
    ensure_member(&state, event.organization_id, user_id).await?;
    Ok(next.run(request).await)
}

/// Membership check on the `organizationId` of a JSON body
///
/// The body is buffered and handed back to the handler untouched.
#[tracing::instrument(skip_all)]
pub async fn require_body_organization_member(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let user_id = caller_id(&request).map_err(IntoResponse::into_response)?;

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BUFFERED_BODY_BYTES).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to buffer request body");
        ErrorResponse::new("validation_error", "Request body is too large or unreadable")
            .into_response()
    })?;

    let organization_id =
        organization_id_from_body(&bytes).map_err(IntoResponse::into_response)?;
    ensure_member(&state, organization_id, user_id)
        .await
        .map_err(IntoResponse::into_response)?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}
