use axum::{extract::rejection::JsonRejection, extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use common::errors::{AuthError, ValidationError};
use common::telemetry;
use serde::{Deserialize, Serialize};

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::middleware::bearer_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
}

/// Exchange an email/password pair for a bearer token
#[tracing::instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<TokenResponse>>, ErrorResponse> {
    let Json(req) = payload?;

    let email = req
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField("email".to_string()))?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::MissingField("password".to_string()))?;

    match state.auth.login(&email, &password).await {
        Ok((issued, user)) => {
            telemetry::record_login("success");
            Ok(Json(SuccessResponse::new(TokenResponse {
                token: issued.token,
                expires_at: issued.expires_at,
                user_id: user.id,
            })))
        }
        Err(err) => {
            let outcome = match err {
                AuthError::InvalidCredentials => "invalid_credentials",
                _ => "error",
            };
            telemetry::record_login(outcome);
            Err(err.into())
        }
    }
}

/// Issue a fresh token for the bearer of a still-valid one
#[tracing::instrument(skip(state, headers))]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse<TokenResponse>>, ErrorResponse> {
    let token = bearer_token(&headers)?;
    let issued = state.auth.refresh(token).await?;
    let claims = state.auth.jwt().decode_token(&issued.token)?;

    Ok(Json(SuccessResponse::new(TokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user_id: claims.user_id,
    })))
}
