//! Shared helpers for auth-service integration tests.
//!
//! Each test builds the full router over a fresh in-memory credential
//! store, so no external services are needed.

#![allow(dead_code)]

use auth_service::{
    build_router,
    config::{AuthConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig},
    models::{Role, User},
    services::{AuthService, JwtService},
    store::InMemoryCredentialStore,
    utils::{hash_password, Password},
    AppState,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
        },
        environment: Environment::Dev,
        service_name: "auth-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        jwt: JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 7,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            // Generous limits so tests never trip them unless they mean to
            login_attempts: 1000,
            login_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
        seed_users_path: "seeds/users.json".to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryCredentialStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with_config(test_config())
    }

    pub fn spawn_with_config(config: AuthConfig) -> Self {
        let store = Arc::new(InMemoryCredentialStore::new());
        let jwt = JwtService::new(&config.jwt).expect("Failed to create JWT service");
        let auth_service = AuthService::new(store.clone(), jwt.clone());

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        let state = AppState {
            config,
            store: store.clone(),
            jwt,
            auth_service,
            login_rate_limiter,
            ip_rate_limiter,
        };

        let router = build_router(state.clone()).expect("Failed to build router");

        Self {
            router,
            state,
            store,
        }
    }

    /// Insert a user with a freshly hashed password; returns the record.
    pub fn seed_user(&self, username: &str, password: &str, role: Role) -> User {
        let password_hash =
            hash_password(&Password::new(password.to_string())).expect("Failed to hash password");
        let user = User::new(
            username.to_string(),
            format!("{username}@example.com"),
            password_hash.into_string(),
            role,
            "Test".to_string(),
            "User".to_string(),
        );
        self.store.insert(user.clone());
        user
    }

    pub async fn post_login(&self, username: &str, password: &str) -> Response {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        self.request(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get_with_token(&self, uri: &str, token: &str) -> Response {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_with_token(&self, uri: &str, token: &str) -> Response {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn request(&self, mut req: Request<Body>) -> Response {
        // Rate limiting keys on the connection address
        req.extensions_mut()
            .insert(axum::extract::ConnectInfo(SocketAddr::from((
                [127, 0, 0, 1],
                8080,
            ))));
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Log in and return the access token; panics on any failure.
    pub async fn login_token(&self, username: &str, password: &str) -> String {
        let response = self.post_login(username, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["access_token"].as_str().unwrap().to_string()
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
