use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::AuthenticatedUser;

/// Log who did what for every API request
pub async fn audit_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let user_id = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|AuthenticatedUser(claims)| claims.user_id);

    tracing::info!(
        user_id = ?user_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API operation"
    );

    response
}
