use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{extractors::AuthUser, jwt::JwtKeys, repo_types::Role};
use crate::error::AppError;

/// Verifies the bearer token and stores the caller's [`AuthUser`] in the
/// request extensions.
pub async fn authenticate(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    req.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(req).await)
}

/// Rejects callers whose role is not in `allowed`. Must run after
/// [`authenticate`].
pub async fn restrict_to(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    if !allowed.contains(&user.role) {
        warn!(user_id = %user.id, role = %user.role, ?allowed, "role not permitted");
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(next.run(req).await)
}

pub async fn require_farmer(req: Request, next: Next) -> Result<Response, AppError> {
    restrict_to(&[Role::Farmer], req, next).await
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    restrict_to(&[Role::Admin], req, next).await
}
