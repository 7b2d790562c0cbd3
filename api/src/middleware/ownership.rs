use std::collections::HashMap;

use axum::{
    extract::{rejection::PathRejection, Path, Request},
    middleware::Next,
    response::Response,
};

use super::membership::{caller_id, id_param};
use crate::handlers::ErrorResponse;

/// Only let callers act on their own `:user_id`
///
/// Must run after [`super::require_auth`]. A malformed `:user_id` is a 400.
#[tracing::instrument(skip_all)]
pub async fn require_owner(
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let caller = caller_id(&request)?;
    let owner = id_param(params, "user_id")?;

    if owner != caller {
        tracing::warn!(user_id = caller, target = owner, "Caller does not own the resource");
        return Err(ErrorResponse::new(
            "forbidden",
            "You can only act on your own account",
        ));
    }

    Ok(next.run(request).await)
}
