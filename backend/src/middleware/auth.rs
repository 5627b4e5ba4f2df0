use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Guards admin routes with the shared API key. An unconfigured key keeps
/// the admin surface locked rather than open.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let expected = state.config.admin_api_key.as_str();
    if expected.is_empty() || presented != Some(expected) {
        return Err(AppError::Unauthorized("Invalid admin API key".to_string()));
    }

    Ok(next.run(request).await)
}
