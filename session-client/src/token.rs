//! Unverified claim extraction for expiry scheduling.
//!
//! The client never holds the signing secret; it trusts tokens it
//! received over the authenticated channel and only needs the embedded
//! expiry (and role) to drive its timers. Signature verification stays
//! on the server.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Role;
use crate::error::SessionError;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl TokenClaims {
    /// Expiry instant; the instant itself is already expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Decode the claims segment of a compact JWT without verifying the
/// signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, SessionError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| SessionError::MalformedToken(format!("claims segment: {e}")))?;

    serde_json::from_slice(&payload)
        .map_err(|e| SessionError::MalformedToken(format!("claims payload: {e}")))
}
