//! Role-based route resolution, kept pure so it can be tested without
//! a session manager.

use crate::api::Role;

pub const LOGIN_PATH: &str = "/login";

/// Dashboard entry point owned by a role.
pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin",
        Role::Staff => "/staff",
        Role::Client => "/client",
        Role::Contractor => "/contractor",
    }
}

/// Role that owns a path, if it is role-scoped at all.
fn owning_role(path: &str) -> Option<Role> {
    let first = path.trim_start_matches('/').split('/').next()?;
    match first {
        "admin" => Some(Role::Admin),
        "staff" => Some(Role::Staff),
        "client" => Some(Role::Client),
        "contractor" => Some(Role::Contractor),
        _ => None,
    }
}

/// Where a navigation request actually lands.
///
/// Unauthenticated users go to the login page. An authenticated user
/// asking for another role's route is sent to their own dashboard, not
/// an error page. Everything else passes through.
pub fn resolve_route<'a>(role: Option<Role>, requested: &'a str) -> &'a str {
    let Some(role) = role else {
        return LOGIN_PATH;
    };

    match owning_role(requested) {
        Some(owner) if owner != role => dashboard_path(role),
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_role_maps_to_its_dashboard() {
        assert_eq!(dashboard_path(Role::Admin), "/admin");
        assert_eq!(dashboard_path(Role::Staff), "/staff");
        assert_eq!(dashboard_path(Role::Client), "/client");
        assert_eq!(dashboard_path(Role::Contractor), "/contractor");
    }

    #[test]
    fn unauthenticated_requests_land_on_login() {
        assert_eq!(resolve_route(None, "/admin"), LOGIN_PATH);
        assert_eq!(resolve_route(None, "/anything"), LOGIN_PATH);
    }

    #[test]
    fn own_role_routes_pass_through() {
        assert_eq!(resolve_route(Some(Role::Staff), "/staff"), "/staff");
        assert_eq!(
            resolve_route(Some(Role::Staff), "/staff/projects/42"),
            "/staff/projects/42"
        );
    }

    #[test]
    fn foreign_role_routes_redirect_to_own_dashboard() {
        assert_eq!(resolve_route(Some(Role::Client), "/admin"), "/client");
        assert_eq!(
            resolve_route(Some(Role::Contractor), "/staff/reports"),
            "/contractor"
        );
    }

    #[test]
    fn unscoped_routes_pass_through_for_any_role() {
        assert_eq!(resolve_route(Some(Role::Admin), "/settings"), "/settings");
    }
}
