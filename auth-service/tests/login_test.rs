mod common;

use auth_service::models::Role;
use auth_service::store::CredentialStore;
use axum::http::StatusCode;
use common::{body_json, TestApp};

#[tokio::test]
async fn login_returns_token_pair_and_profile() {
    let app = TestApp::spawn();
    let user = app.seed_user("admin", "admin123", Role::Admin);

    let response = app.post_login("admin", "admin123").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["access_token"].as_str().unwrap().len() > 20);
    assert!(body["refresh_token"].as_str().unwrap().len() > 20);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["user_role"], "admin");
    assert_eq!(body["user"]["user_id"], user.user_id.to_string());
    // The profile never carries the hash
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_tokens_verify_against_their_own_keys_only() {
    let app = TestApp::spawn();
    app.seed_user("staff1", "staff123", Role::Staff);

    let response = app.post_login("staff1", "staff123").await;
    let body = body_json(response).await;
    let access = body["access_token"].as_str().unwrap();
    let refresh = body["refresh_token"].as_str().unwrap();

    assert!(app.state.jwt.verify_access_token(access).is_ok());
    assert!(app.state.jwt.verify_refresh_token(refresh).is_ok());
    // Crossed kinds must fail even though both are well-formed JWTs
    assert!(app.state.jwt.verify_access_token(refresh).is_err());
    assert!(app.state.jwt.verify_refresh_token(access).is_err());
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::spawn();
    app.seed_user("client1", "client123", Role::Client);

    let response = app.post_login("client1", "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid username or password");
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_indistinguishable() {
    let app = TestApp::spawn();
    app.seed_user("client1", "client123", Role::Client);

    let wrong_password = app.post_login("client1", "wrong-pass").await;
    let unknown_user = app.post_login("nobody", "wrong-pass").await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_user).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn disabled_account_is_rejected_with_specific_message() {
    let app = TestApp::spawn();
    let user = app.seed_user("contractor1", "contractor123", Role::Contractor);
    app.store.update(user.user_id, |u| u.is_active = false);

    // Correct password, so the caller learns the account state
    let response = app.post_login("contractor1", "contractor123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Account is disabled");
}

#[tokio::test]
async fn deleted_account_is_rejected_with_specific_message() {
    let app = TestApp::spawn();
    let user = app.seed_user("staff1", "staff123", Role::Staff);
    app.store.update(user.user_id, |u| u.is_deleted = true);

    let response = app.post_login("staff1", "staff123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Account has been deleted");
}

#[tokio::test]
async fn disabled_account_with_wrong_password_reports_bad_credentials() {
    // Password is checked before account state, so a guesser with a bad
    // password never learns the account is disabled.
    let app = TestApp::spawn();
    let user = app.seed_user("client1", "client123", Role::Client);
    app.store.update(user.user_id, |u| u.is_active = false);

    let response = app.post_login("client1", "wrong-pass").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid username or password");
}

#[tokio::test]
async fn username_lookup_is_case_sensitive() {
    let app = TestApp::spawn();
    app.seed_user("admin", "admin123", Role::Admin);

    let response = app.post_login("Admin", "admin123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn out_of_range_fields_fail_validation() {
    let app = TestApp::spawn();
    app.seed_user("ab", "short", Role::Client);

    // Username below 3 chars
    let response = app.post_login("ab", "longenough").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Password below 6 chars
    let response = app.post_login("client1", "short").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Password above 32 chars
    let response = app
        .post_login("client1", &"x".repeat(33))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_touches_last_active() {
    let app = TestApp::spawn();
    let user = app.seed_user("staff1", "staff123", Role::Staff);

    let response = app.post_login("staff1", "staff123").await;
    assert_eq!(response.status(), StatusCode::OK);

    // The touch runs on a spawned task; give it a beat
    tokio::task::yield_now().await;
    let record = app.store.find_by_id(user.user_id).await.unwrap().unwrap();
    assert!(record.last_active.is_some());
}
