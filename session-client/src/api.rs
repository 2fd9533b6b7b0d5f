//! Authentication API surface the session manager drives.
//!
//! `HttpAuthApi` talks to a live auth service over HTTP; tests plug a
//! mock into the same trait.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 32;

/// Account role, mirrored from the server's claim vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Client,
    Contractor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Client => "client",
            Role::Contractor => "contractor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sanitized profile snapshot persisted alongside the tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_role: Role,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Mirror of the server's input constraints, checked before any
/// network call.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), SessionError> {
    let username_len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        return Err(SessionError::Validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    let password_len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&password_len) {
        return Err(SessionError::Validation(format!(
            "Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, SessionError>;

    /// Mints a fresh access token; identity comes from the presented
    /// bearer token, so no body is sent.
    async fn refresh(&self, access_token: &str) -> Result<RefreshResponse, SessionError>;

    /// Best-effort server acknowledgement; the server keeps no session
    /// state to tear down.
    async fn logout(&self, access_token: &str) -> Result<(), SessionError>;

    /// Protected probe used to validate a restored session.
    async fn validate(&self, access_token: &str) -> Result<UserProfile, SessionError>;
}

/// HTTP implementation against the auth service.
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

/// Per-request ceiling; a server that answers slower than this is
/// treated as unreachable.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a response as `T` on 2xx, or surface the server's error body.
async fn read_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SessionError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| SessionError::Transport(format!("Malformed response body: {e}")))
    } else {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.to_string());
        Err(SessionError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, SessionError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        read_response(response).await
    }

    async fn refresh(&self, access_token: &str) -> Result<RefreshResponse, SessionError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        read_response(response).await
    }

    async fn logout(&self, access_token: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SessionError::Rejected {
                status: status.as_u16(),
                message: status.to_string(),
            })
        }
    }

    async fn validate(&self, access_token: &str) -> Result<UserProfile, SessionError> {
        let response = self
            .client
            .get(self.url("/users/me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        read_response(response).await
    }
}
