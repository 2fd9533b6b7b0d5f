//! Client Session Manager.
//!
//! One tokio task owns the whole session state machine
//! (`LoggedOut → Authenticating → Active → (Warning) → LoggedOut`) and
//! all four timer categories: hard logout at token expiry, silent
//! refresh 60 s before it, the inactivity window, and the warning
//! countdown. Deadlines are recomputed on every transition and live in
//! the session struct, so dropping the session structurally cancels
//! every pending timer and nothing can fire after logout.
//!
//! Callers hold a cloneable [`SessionHandle`]; state changes are
//! observable through a broadcast channel. Timers run on tokio's clock,
//! which tests virtualize with `start_paused`.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Duration, Instant};

use crate::api::{validate_credentials, AuthApi, Role, UserProfile};
use crate::error::SessionError;
use crate::routes::dashboard_path;
use crate::storage::{SessionData, SessionStore, StorageTier};
use crate::token::{decode_claims, TokenClaims};

/// How long before token expiry the silent refresh fires.
pub const REFRESH_LEAD: Duration = Duration::from_secs(60);
/// Tracked-input silence that triggers the warning.
pub const INACTIVITY_LIMIT: Duration = Duration::from_secs(50 * 60);
/// Warning countdown before inactivity logout.
pub const WARNING_COUNTDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    Active,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    TokenExpired,
    Inactivity,
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn { role: Role, redirect: String },
    Restored { role: Role, redirect: String },
    Refreshed,
    WarningStarted { countdown: Duration },
    WarningCancelled,
    LoggedOut { reason: LogoutReason },
}

enum Command {
    Login {
        username: String,
        password: String,
        remember_me: bool,
        reply: oneshot::Sender<Result<UserProfile, SessionError>>,
    },
    Logout {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Restore {
        reply: oneshot::Sender<Result<Option<UserProfile>, SessionError>>,
    },
    /// A tracked user input (pointer, key, touch)
    Activity,
    State {
        reply: oneshot::Sender<SessionState>,
    },
}

/// Cloneable front door to the manager task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<UserProfile, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Login {
                username: username.to_string(),
                password: password.to_string(),
                remember_me,
                reply,
            })
            .await
            .map_err(|_| SessionError::ManagerClosed)?;
        rx.await.map_err(|_| SessionError::ManagerClosed)?
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Logout { reply })
            .await
            .map_err(|_| SessionError::ManagerClosed)?;
        rx.await.map_err(|_| SessionError::ManagerClosed)?
    }

    /// Validate and adopt a persisted session, if any.
    pub async fn restore(&self) -> Result<Option<UserProfile>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Restore { reply })
            .await
            .map_err(|_| SessionError::ManagerClosed)?;
        rx.await.map_err(|_| SessionError::ManagerClosed)?
    }

    /// Report a tracked input event; resets the inactivity window and
    /// cancels a running warning countdown.
    pub async fn record_activity(&self) -> Result<(), SessionError> {
        self.tx
            .send(Command::Activity)
            .await
            .map_err(|_| SessionError::ManagerClosed)
    }

    pub async fn state(&self) -> Result<SessionState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::State { reply })
            .await
            .map_err(|_| SessionError::ManagerClosed)?;
        rx.await.map_err(|_| SessionError::ManagerClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Live session owned by the manager task. Every pending deadline lives
/// here; dropping the struct cancels them all.
struct ActiveSession {
    tier: StorageTier,
    data: SessionData,
    hard_logout_at: Instant,
    refresh_at: Option<Instant>,
    inactivity_at: Instant,
    warning_ends_at: Option<Instant>,
}

pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    storage: SessionStore,
    events: broadcast::Sender<SessionEvent>,
    rx: mpsc::Receiver<Command>,
    state: SessionState,
    session: Option<ActiveSession>,
}

impl SessionManager {
    /// Start the manager task and hand back its handle.
    pub fn spawn(api: Arc<dyn AuthApi>, storage: SessionStore) -> SessionHandle {
        let (tx, rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(64);

        let manager = SessionManager {
            api,
            storage,
            events: events.clone(),
            rx,
            state: SessionState::LoggedOut,
            session: None,
        };
        tokio::spawn(manager.run());

        SessionHandle { tx, events }
    }

    async fn run(mut self) {
        loop {
            let hard = self.session.as_ref().map(|s| s.hard_logout_at);
            let refresh = self.session.as_ref().and_then(|s| s.refresh_at);
            let warning = self.session.as_ref().and_then(|s| s.warning_ends_at);
            // The inactivity deadline is suspended while the warning
            // countdown runs
            let inactivity = self
                .session
                .as_ref()
                .filter(|s| s.warning_ends_at.is_none())
                .map(|s| s.inactivity_at);

            tokio::select! {
                biased;

                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // All handles dropped; tear down quietly
                    None => break,
                },
                _ = sleep_until(or_far_future(hard)), if hard.is_some() => {
                    self.do_logout(LogoutReason::TokenExpired).await;
                }
                _ = sleep_until(or_far_future(warning)), if warning.is_some() => {
                    self.do_logout(LogoutReason::Inactivity).await;
                }
                _ = sleep_until(or_far_future(refresh)), if refresh.is_some() => {
                    self.handle_refresh_due().await;
                }
                _ = sleep_until(or_far_future(inactivity)), if inactivity.is_some() => {
                    self.start_warning();
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Login {
                username,
                password,
                remember_me,
                reply,
            } => {
                let result = self.do_login(&username, &password, remember_me).await;
                let _ = reply.send(result);
            }
            Command::Logout { reply } => {
                if self.session.is_none() {
                    let _ = reply.send(Err(SessionError::NotLoggedIn));
                } else {
                    self.do_logout(LogoutReason::UserRequested).await;
                    let _ = reply.send(Ok(()));
                }
            }
            Command::Restore { reply } => {
                let result = self.do_restore().await;
                let _ = reply.send(result);
            }
            Command::Activity => self.note_activity(),
            Command::State { reply } => {
                let _ = reply.send(self.state);
            }
        }
    }

    async fn do_login(
        &mut self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<UserProfile, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::Validation(
                "A session is already active; log out first".to_string(),
            ));
        }
        validate_credentials(username, password)?;

        self.state = SessionState::Authenticating;
        let response = match self.api.login(username, password).await {
            Ok(response) => response,
            Err(e) => {
                self.state = SessionState::LoggedOut;
                return Err(e);
            }
        };

        let tier = if remember_me {
            StorageTier::Durable
        } else {
            StorageTier::TabScoped
        };
        let data = SessionData {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            user: response.user,
        };
        self.activate(data, tier, false)
    }

    async fn do_restore(&mut self) -> Result<Option<UserProfile>, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::Validation(
                "A session is already active".to_string(),
            ));
        }

        let Some((tier, data)) = self.storage.restore()? else {
            return Ok(None);
        };

        // Cheap local expiry check before the network probe
        let still_valid = decode_claims(&data.access_token)
            .map(|c| !c.is_expired_at(Utc::now()))
            .unwrap_or(false);
        if !still_valid {
            self.storage.clear_all()?;
            return Ok(None);
        }

        match self.api.validate(&data.access_token).await {
            Ok(profile) => {
                // The server's profile wins over the stored snapshot
                let data = SessionData {
                    user: profile,
                    ..data
                };
                self.activate(data, tier, true).map(Some)
            }
            Err(e) if e.is_terminal() => {
                tracing::info!(error = %e, "Persisted session rejected; clearing");
                self.storage.clear_all()?;
                Ok(None)
            }
            // Transport failures leave the persisted session in place
            Err(e) => Err(e),
        }
    }

    /// Persist, schedule all deadlines from the token's expiry, and go
    /// `Active`.
    fn activate(
        &mut self,
        data: SessionData,
        tier: StorageTier,
        restored: bool,
    ) -> Result<UserProfile, SessionError> {
        let claims = match decode_claims(&data.access_token) {
            Ok(claims) => claims,
            Err(e) => {
                self.state = SessionState::LoggedOut;
                return Err(e);
            }
        };
        if let Err(e) = self.storage.persist(tier, &data) {
            self.state = SessionState::LoggedOut;
            return Err(e);
        }

        let (hard_logout_at, refresh_at) = token_deadlines(&claims);
        let user = data.user.clone();
        let role = claims.role;

        self.session = Some(ActiveSession {
            tier,
            data,
            hard_logout_at,
            refresh_at,
            inactivity_at: Instant::now() + INACTIVITY_LIMIT,
            warning_ends_at: None,
        });
        self.state = SessionState::Active;

        let redirect = dashboard_path(role).to_string();
        let event = if restored {
            SessionEvent::Restored { role, redirect }
        } else {
            SessionEvent::LoggedIn { role, redirect }
        };
        let _ = self.events.send(event);

        Ok(user)
    }

    async fn handle_refresh_due(&mut self) {
        let (token, tier, hard_logout_at) = match self.session.as_mut() {
            Some(session) => {
                session.refresh_at = None;
                (
                    session.data.access_token.clone(),
                    session.tier,
                    session.hard_logout_at,
                )
            }
            None => return,
        };

        // The refresh call must not outlive the token it renews: a call
        // still pending at the hard-expiry instant counts as a failure,
        // so logout is never later than the original expiry.
        let refreshed =
            match tokio::time::timeout_at(hard_logout_at, self.api.refresh(&token)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Silent refresh still pending at token expiry; logging out");
                    self.do_logout(LogoutReason::RefreshFailed).await;
                    return;
                }
            };
        // Logout may have raced the refresh; only apply to a live session
        if self.session.is_none() {
            return;
        }

        let response = match refreshed {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Silent refresh failed; logging out");
                self.do_logout(LogoutReason::RefreshFailed).await;
                return;
            }
        };
        let claims = match decode_claims(&response.access_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Refreshed token unreadable; logging out");
                self.do_logout(LogoutReason::RefreshFailed).await;
                return;
            }
        };

        let data = {
            let session = self.session.as_mut().expect("session checked above");
            session.data.access_token = response.access_token;
            let (hard_logout_at, refresh_at) = token_deadlines(&claims);
            session.hard_logout_at = hard_logout_at;
            session.refresh_at = refresh_at;
            session.data.clone()
        };
        if let Err(e) = self.storage.persist(tier, &data) {
            tracing::warn!(error = %e, "Failed to persist refreshed token");
        }
        let _ = self.events.send(SessionEvent::Refreshed);
    }

    fn start_warning(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.warning_ends_at = Some(Instant::now() + WARNING_COUNTDOWN);
        self.state = SessionState::Warning;
        let _ = self.events.send(SessionEvent::WarningStarted {
            countdown: WARNING_COUNTDOWN,
        });
    }

    fn note_activity(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.inactivity_at = Instant::now() + INACTIVITY_LIMIT;
        if session.warning_ends_at.take().is_some() {
            self.state = SessionState::Active;
            let _ = self.events.send(SessionEvent::WarningCancelled);
        }
    }

    /// Shared teardown for every exit path: user logout, hard expiry,
    /// inactivity, refresh failure.
    async fn do_logout(&mut self, reason: LogoutReason) {
        // Taking the session cancels all four deadline categories at once
        let session = self.session.take();
        self.state = SessionState::LoggedOut;

        if let Some(session) = session {
            // Best effort; the server holds no session state anyway
            if let Err(e) = self.api.logout(&session.data.access_token).await {
                tracing::debug!(error = %e, "Logout acknowledgement failed");
            }
        }
        if let Err(e) = self.storage.clear_all() {
            tracing::warn!(error = %e, "Failed to clear session storage");
        }
        let _ = self.events.send(SessionEvent::LoggedOut { reason });
    }
}

/// Hard-logout and silent-refresh deadlines for a token, on tokio's
/// clock. A token already inside the refresh lead is refreshed
/// immediately.
fn token_deadlines(claims: &TokenClaims) -> (Instant, Option<Instant>) {
    let remaining = (claims.exp - Utc::now().timestamp()).max(0) as u64;
    let now = Instant::now();
    let hard = now + Duration::from_secs(remaining);
    let refresh = if remaining > REFRESH_LEAD.as_secs() {
        now + Duration::from_secs(remaining - REFRESH_LEAD.as_secs())
    } else {
        now
    };
    (hard, Some(refresh))
}

/// Stand-in instant for disabled select branches; never polled.
fn or_far_future(deadline: Option<Instant>) -> Instant {
    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400 * 365))
}
