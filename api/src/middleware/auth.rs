use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use common::errors::AuthError;
use common::models::UserClaims;

use crate::state::AppState;

/// Claims of the verified bearer, stored in request extensions
///
/// A copy is also attached to the response so outer layers such as the audit
/// log can see who made the request.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserClaims);

/// Extract the token from an `Authorization: Bearer <jwt>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Malformed Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Expected a Bearer token".to_string()))
}

async fn run_as(user: AuthenticatedUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    response
}

/// Reject requests without a valid bearer token
#[tracing::instrument(skip_all)]
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = state.auth.jwt().decode_token(bearer_token(request.headers())?)?;
    tracing::debug!(user_id = claims.user_id, "Bearer token accepted");
    Ok(run_as(AuthenticatedUser(claims), request, next).await)
}

/// Attach the caller's identity when a valid token is present, never reject
#[tracing::instrument(skip_all)]
pub async fn optional_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let claims = bearer_token(request.headers())
        .and_then(|token| state.auth.jwt().decode_token(token));

    match claims {
        Ok(claims) => run_as(AuthenticatedUser(claims), request, next).await,
        Err(AuthError::MissingToken) => next.run(request).await,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unusable bearer token");
            next.run(request).await
        }
    }
}
