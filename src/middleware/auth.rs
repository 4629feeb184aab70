use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// Authenticated user injected into request extensions by [`auth_middleware`].
#[derive(Clone)]
pub struct CurrentUser(pub User);

pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    let user = state
        .session_service
        .validate(token)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid or expired session token"))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
