use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dtos::auth::{LoginRequest, LoginResponse, LogoutResponse, RefreshResponse},
    services::{JwtService, ServiceError},
    store::CredentialStore,
    utils::{verify_password, Password, PasswordHashString},
};

/// Orchestrates credential verification, account-status checks and token
/// issuance. Stateless across requests; the only shared collaborator is
/// the credential store.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        // Unknown username falls through to the same error as a wrong
        // password.
        let user = self
            .store
            .find_by_username(&req.username)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        // Status flags block login regardless of password correctness.
        if !user.is_active {
            return Err(ServiceError::AccountDisabled);
        }
        if user.is_deleted {
            return Err(ServiceError::AccountDeleted);
        }

        let access_token = self
            .jwt
            .generate_access_token(user.user_id, user.user_role)
            .map_err(ServiceError::Internal)?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(user.user_id, user.user_role)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.user_id, role = %user.user_role, "User logged in");

        // Advisory stamp; never blocks the login path.
        let store = self.store.clone();
        let user_id = user.user_id;
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_active(user_id).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to touch last_active");
            }
        });

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
            user: user.profile(),
        })
    }

    /// Mint a fresh access token for an already-authenticated identity.
    ///
    /// The record is re-read so a role change or deactivation since the
    /// last issuance takes effect now, not at refresh-token expiry.
    pub async fn refresh(&self, user_id: Uuid) -> Result<RefreshResponse, ServiceError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::UserNotFound)?;

        if !user.is_active {
            return Err(ServiceError::AccountDisabled);
        }
        if user.is_deleted {
            return Err(ServiceError::AccountDeleted);
        }

        let access_token = self
            .jwt
            .generate_access_token(user.user_id, user.user_role)
            .map_err(ServiceError::Internal)?;

        tracing::info!(user_id = %user.user_id, "Access token refreshed");

        Ok(RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }

    /// Tokens are stateless, so logout is an acknowledgement; real
    /// invalidation happens client-side by discarding the tokens.
    pub fn logout(&self, user_id: Uuid) -> LogoutResponse {
        tracing::info!(user_id = %user_id, "User logged out");
        LogoutResponse {
            message: "Successfully logged out".to_string(),
        }
    }
}
