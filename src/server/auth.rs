//! Bearer authentication for sync routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::error::{AuthError, SyncError};
use crate::sync::bearer_token;

/// Resolves the bearer credential to a [`Device`](crate::models::Device) and
/// adds it to the request extensions.
pub async fn require_device(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, SyncError> {
    let header = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedCredential)?),
        None => None,
    };
    let token = bearer_token(header)?;

    let device = state.engine.authenticate(token).await.inspect_err(|e| {
        tracing::debug!("Rejected credential: {}", e);
    })?;

    request.extensions_mut().insert(device);
    Ok(next.run(request).await)
}
