use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::app_error::AppError;

/// Resolve the current user from the `Authorization: Bearer <uuid>` header
/// and inject it as a request extension. Core operations take the user id as
/// an explicit parameter; this middleware is the only place that reads
/// request-ambient identity.
pub async fn users_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
        .ok_or(AppError::Unauthenticated)?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
