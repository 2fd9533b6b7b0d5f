//! Cross-crate workflow test infrastructure.
//!
//! Boots the auth service in-process on an ephemeral port and hands
//! back everything a test needs to drive it over real HTTP with the
//! session client.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use auth_service::{
    build_router,
    config::{AuthConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig},
    models::{Role, User},
    services::{AuthService, JwtService},
    store::InMemoryCredentialStore,
    utils::{hash_password, Password},
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;

/// The well-known dev seed accounts.
pub const SEED_ACCOUNTS: [(&str, &str, Role); 4] = [
    ("admin", "admin123", Role::Admin),
    ("staff1", "staff123", Role::Staff),
    ("client1", "client123", Role::Client),
    ("contractor1", "contractor123", Role::Contractor),
];

/// An auth service listening on a local ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    pub state: AppState,
    pub store: Arc<InMemoryCredentialStore>,
    server: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "auth-service".to_string(),
        service_version: "workflow-test".to_string(),
        log_level: "error".to_string(),
        jwt: JwtConfig {
            access_secret: "workflow-access-secret".to_string(),
            refresh_secret: "workflow-refresh-secret".to_string(),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 7,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
        seed_users_path: "unused".to_string(),
    }
}

/// Insert the four seed accounts with freshly hashed passwords.
pub fn seed_accounts(store: &InMemoryCredentialStore) -> Result<()> {
    for (username, password, role) in SEED_ACCOUNTS {
        let password_hash = hash_password(&Password::new(password.to_string()))?;
        store.insert(User::new(
            username.to_string(),
            format!("{username}@example.com"),
            password_hash.into_string(),
            role,
            "Seed".to_string(),
            "User".to_string(),
        ));
    }
    Ok(())
}

/// Start a seeded auth service and serve it until the handle drops.
pub async fn spawn_auth_service() -> Result<TestServer> {
    let config = test_config();

    let store = Arc::new(InMemoryCredentialStore::new());
    seed_accounts(&store)?;

    let jwt = JwtService::new(&config.jwt)?;
    let auth_service = AuthService::new(store.clone(), jwt.clone());

    let state = AppState {
        config: config.clone(),
        store: store.clone(),
        jwt,
        auth_service,
        login_rate_limiter: create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        ),
        ip_rate_limiter: create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        ),
    };

    let app = build_router(state.clone()).map_err(|e| anyhow::anyhow!("{e}"))?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            tracing::error!(error = %e, "Test auth service exited");
        }
    });

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        addr,
        state,
        store,
        server,
    })
}
