//! Mock auth API and token fabrication for session manager tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use session_client::{
    api::{LoginResponse, RefreshResponse},
    AuthApi, Role, SessionError, SessionEvent, UserProfile,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Unsigned-but-well-formed JWT; the client never checks signatures.
pub fn make_token(role: Role, exp: i64) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": Uuid::new_v4(),
        "role": role,
        "exp": exp,
        "iat": exp - 3600,
        "jti": Uuid::new_v4().to_string(),
    });
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.unsigned")
}

pub fn sample_profile(role: Role) -> UserProfile {
    UserProfile {
        user_id: Uuid::new_v4(),
        username: "client1".to_string(),
        email: "client1@example.com".to_string(),
        first_name: "Cleo".to_string(),
        last_name: "Client".to_string(),
        user_role: role,
        profile_pic: None,
    }
}

pub struct MockApi {
    role: Role,
    profile: UserProfile,
    login_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    fail_login: AtomicBool,
    fail_refresh: AtomicBool,
    stall_refresh: AtomicBool,
    fail_validate: AtomicBool,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
}

impl MockApi {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            profile: sample_profile(role),
            login_ttl_seconds: 3600,
            refresh_ttl_seconds: 3600,
            fail_login: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            stall_refresh: AtomicBool::new(false),
            fail_validate: AtomicBool::new(false),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_login_ttl(mut self, seconds: i64) -> Self {
        self.login_ttl_seconds = seconds;
        self
    }

    pub fn with_refresh_ttl(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    pub fn set_fail_login(&self, fail: bool) {
        self.fail_login.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Make refresh hang forever, like a server that accepts the
    /// connection and never answers.
    pub fn set_stall_refresh(&self, stall: bool) {
        self.stall_refresh.store(stall, Ordering::SeqCst);
    }

    pub fn set_fail_validate(&self, fail: bool) {
        self.fail_validate.store(fail, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for MockApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<LoginResponse, SessionError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected {
                status: 401,
                message: "Invalid username or password".to_string(),
            });
        }
        let now = Utc::now().timestamp();
        Ok(LoginResponse {
            access_token: make_token(self.role, now + self.login_ttl_seconds),
            refresh_token: make_token(self.role, now + 7 * 86_400),
            token_type: "Bearer".to_string(),
            expires_in: self.login_ttl_seconds,
            user: self.profile.clone(),
        })
    }

    async fn refresh(&self, _access_token: &str) -> Result<RefreshResponse, SessionError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_refresh.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected {
                status: 401,
                message: "token expired".to_string(),
            });
        }
        let now = Utc::now().timestamp();
        Ok(RefreshResponse {
            access_token: make_token(self.role, now + self.refresh_ttl_seconds),
            token_type: "Bearer".to_string(),
            expires_in: self.refresh_ttl_seconds,
        })
    }

    async fn logout(&self, _access_token: &str) -> Result<(), SessionError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn validate(&self, _access_token: &str) -> Result<UserProfile, SessionError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_validate.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected {
                status: 401,
                message: "invalid token".to_string(),
            });
        }
        Ok(self.profile.clone())
    }
}

/// Let the manager task run until it has nothing left to do.
pub async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

/// Collect everything the manager has broadcast so far.
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
