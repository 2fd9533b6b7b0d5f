//! Client-side session lifecycle for the project-management suite:
//! login, silent token refresh, inactivity logout with a warning
//! countdown, persisted sessions across restarts, and role-based
//! routing.

pub mod api;
pub mod error;
pub mod manager;
pub mod routes;
pub mod storage;
pub mod token;

pub use api::{AuthApi, HttpAuthApi, Role, UserProfile};
pub use error::SessionError;
pub use manager::{
    LogoutReason, SessionEvent, SessionHandle, SessionManager, SessionState, INACTIVITY_LIMIT,
    REFRESH_LEAD, WARNING_COUNTDOWN,
};
pub use routes::{dashboard_path, resolve_route, LOGIN_PATH};
pub use storage::{
    FileStorage, MemoryStorage, SessionData, SessionStore, StorageTier, TokenStorage,
};
