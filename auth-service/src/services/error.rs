use service_core::error::AppError;
use thiserror::Error;

use super::jwt::TokenError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Account has been deleted")]
    AccountDeleted,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ServiceError::TokenExpired,
            TokenError::Invalid => ServiceError::TokenInvalid,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => AppError::InternalError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            // Same external message for unknown username and wrong
            // password; no enumeration signal.
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid username or password"))
            }
            ServiceError::AccountDisabled => {
                AppError::AuthError(anyhow::anyhow!("Account is disabled"))
            }
            ServiceError::AccountDeleted => {
                AppError::AuthError(anyhow::anyhow!("Account has been deleted"))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::TokenInvalid => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid token"))
            }
            ServiceError::TokenExpired => {
                AppError::Unauthorized(anyhow::anyhow!("Token expired"))
            }
        }
    }
}
