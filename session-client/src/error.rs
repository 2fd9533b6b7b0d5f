use thiserror::Error;

/// Client-side session failures.
///
/// Server rejections keep their HTTP status and the server's coarse
/// error message; internal reasons are never surfaced beyond that.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server rejected the request (4xx/5xx)
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Token could not even be decoded for expiry inspection
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("No active session")]
    NotLoggedIn,

    /// The manager task is gone; the session is unusable
    #[error("Session manager closed")]
    ManagerClosed,
}

impl SessionError {
    /// True for rejections that mean the session itself is dead and the
    /// client must log out rather than retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionError::Rejected { status: 401, .. } | SessionError::MalformedToken(_)
        )
    }
}
