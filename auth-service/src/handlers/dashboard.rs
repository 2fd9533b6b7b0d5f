//! Dashboard entry points, one per role.
//!
//! The dashboard content itself (projects, reports, user management)
//! lives in other services; these endpoints are the role-guarded
//! landing surface the client redirects to after login.

use axum::{response::IntoResponse, Json};
use serde_json::json;

use crate::middleware::AuthUser;

pub async fn admin_overview(user: AuthUser) -> impl IntoResponse {
    overview("admin", user)
}

pub async fn staff_overview(user: AuthUser) -> impl IntoResponse {
    overview("staff", user)
}

pub async fn client_overview(user: AuthUser) -> impl IntoResponse {
    overview("client", user)
}

pub async fn contractor_overview(user: AuthUser) -> impl IntoResponse {
    overview("contractor", user)
}

fn overview(dashboard: &str, user: AuthUser) -> impl IntoResponse {
    Json(json!({
        "dashboard": dashboard,
        "user_id": user.0.sub,
        "role": user.0.role,
    }))
}
