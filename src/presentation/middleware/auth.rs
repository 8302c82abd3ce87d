//! Authentication Middleware
//!
//! Verifies the forum's bearer token before a chat connection is upgraded.
//! Browsers cannot set headers on a WebSocket handshake, so the token may
//! arrive as `?token=`; the query parameter wins over the header.

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::Deserialize;

use crate::application::services::AuthError;
use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the raw token from the query string or the Authorization header.
fn extract_token(request: &Request) -> Option<String> {
    let from_query = Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty());

    from_query.or_else(|| {
        request
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_string())
    })
}

/// Reject the request with 401 unless it carries a valid token. On success
/// the verified [`AuthenticatedUser`](crate::application::services::AuthenticatedUser)
/// is attached as a request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request).ok_or(AuthError::MissingToken)?;

    let user = state.auth.verify(&token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected chat upgrade");
        e
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
