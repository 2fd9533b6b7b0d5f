pub mod auth;
pub mod error;
pub mod jwt;

pub use auth::AuthService;
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims, TokenError};
