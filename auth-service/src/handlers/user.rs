use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{middleware::AuthUser, AppState};

/// Current user's profile. Doubles as the session-validation probe for
/// the client on page load.
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user profile", body = UserProfile),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .find_by_id(user.0.sub)
        .await
        .map_err(AppError::InternalError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(record.profile()))
}
