//! Session Guard: bearer extraction, verification, role authorization.
//!
//! A protected request moves through token-present, verified and
//! authorized stages; any failure rejects with 401, a role mismatch on a
//! role-scoped route rejects with 403.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::Role, services::AccessTokenClaims, AppState};

/// Require a verified access token; attaches its claims to the request
/// extensions for downstream handlers and role guards.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = token.ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let claims = state
        .jwt
        .verify_access_token(token)
        .map_err(|e| AppError::Unauthorized(anyhow::anyhow!("{}", e)))?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Require one of `allowed` roles on an already-authenticated request.
/// Must be layered inside `auth_middleware`.
pub async fn require_roles(
    allowed: &[Role],
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<AccessTokenClaims>()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not authenticated")))?;

    if !allowed.contains(&claims.role) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Role '{}' is not permitted for this resource",
            claims.role
        )));
    }

    Ok(next.run(req).await)
}

/// Extractor to easily get verified claims in handlers
pub struct AuthUser(pub AccessTokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<AccessTokenClaims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Auth claims missing from request extensions"))
        })?;

        Ok(AuthUser(claims.clone()))
    }
}
