//! Integration tests for account registration, email verification, login,
//! token refresh, logout, and password recovery.

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn register_conflicts_on_duplicate_email() {
    let app = TestApp::spawn().await;

    let payload = json!({
        "email": "user@clinic.test",
        "password": "password123",
        "full_name": "Test User"
    });

    let res = app
        .client
        .post(app.url("/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let res = app
        .client
        .post(app.url("/auth/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let app = TestApp::spawn().await;
    app.register_and_login("user@clinic.test", "password123")
        .await;

    let wrong_password = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "user@clinic.test", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);
    let wrong_password: Value = wrong_password.json().await.unwrap();

    let unknown_user = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "nobody@clinic.test", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_user.status(), 401);
    let unknown_user: Value = unknown_user.json().await.unwrap();

    // Same message for both failure modes.
    assert_eq!(wrong_password["error"], unknown_user["error"]);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn verification_token_is_single_use() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({
            "email": "user@clinic.test",
            "password": "password123",
            "full_name": "Test User"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let token = app
        .email
        .last_token_for("user@clinic.test", "verification")
        .expect("verification email should have been sent");

    let res = app
        .client
        .get(app.url(&format!("/auth/verify?token={}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = app
        .client
        .get(app.url(&format!("/auth/verify?token={}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);

    let res = app
        .client
        .get(app.url("/auth/verify?token=not-a-real-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn unverified_users_are_gated_when_verification_is_required() {
    let app = TestApp::spawn_with_verification(true).await;

    app.client
        .post(app.url("/auth/register"))
        .json(&json!({
            "email": "user@clinic.test",
            "password": "password123",
            "full_name": "Test User"
        }))
        .send()
        .await
        .unwrap();

    // Login itself succeeds; protected routes are what the gate blocks.
    let login: Value = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "user@clinic.test", "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let access_token = login["tokens"]["access_token"].as_str().unwrap().to_string();

    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let token = app
        .email
        .last_token_for("user@clinic.test", "verification")
        .unwrap();
    app.client
        .get(app.url(&format!("/auth/verify?token={}", token)))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn refresh_issues_a_new_access_token() {
    let app = TestApp::spawn().await;
    app.register_and_login("user@clinic.test", "password123")
        .await;
    let login = app.login_response("user@clinic.test", "password123").await;
    let refresh_token = login["tokens"]["refresh_token"].as_str().unwrap();

    let res = app
        .client
        .post(app.url("/auth/refresh"))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();

    let new_access = body["tokens"]["access_token"].as_str().unwrap();
    assert_eq!(body["tokens"]["refresh_token"], refresh_token);

    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth(new_access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn logout_revokes_the_session_and_blacklists_the_access_token() {
    let app = TestApp::spawn().await;
    app.register_and_login("user@clinic.test", "password123")
        .await;
    let login = app.login_response("user@clinic.test", "password123").await;
    let access_token = login["tokens"]["access_token"].as_str().unwrap().to_string();
    let refresh_token = login["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let res = app
        .client
        .post(app.url("/auth/logout"))
        .bearer_auth(&access_token)
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // The access token is rejected for the rest of its lifetime.
    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    // The refresh session is gone too.
    let res = app
        .client
        .post(app.url("/auth/refresh"))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn password_reset_replaces_the_password_and_revokes_sessions() {
    let app = TestApp::spawn().await;
    app.register_and_login("user@clinic.test", "password123")
        .await;
    let login = app.login_response("user@clinic.test", "password123").await;
    let old_refresh = login["tokens"]["refresh_token"].as_str().unwrap().to_string();

    // Unknown addresses get the same answer as known ones.
    let res = app
        .client
        .post(app.url("/auth/password-reset/request"))
        .json(&json!({ "email": "nobody@clinic.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = app
        .client
        .post(app.url("/auth/password-reset/request"))
        .json(&json!({ "email": "user@clinic.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let reset_token = app
        .email
        .last_token_for("user@clinic.test", "password_reset")
        .expect("reset email should have been sent");

    let res = app
        .client
        .post(app.url("/auth/password-reset/confirm"))
        .json(&json!({ "token": reset_token, "new_password": "newpassword456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Reset tokens are single use.
    let res = app
        .client
        .post(app.url("/auth/password-reset/confirm"))
        .json(&json!({ "token": reset_token, "new_password": "another789pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);

    // Old password no longer works, new one does.
    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "user@clinic.test", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    app.login("user@clinic.test", "newpassword456").await;

    // Every pre-reset refresh session is dead.
    let res = app
        .client
        .post(app.url("/auth/refresh"))
        .json(&json!({ "refresh_token": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn change_password_verifies_the_current_password() {
    let app = TestApp::spawn().await;
    let (access_token, _) = app
        .register_and_login("user@clinic.test", "password123")
        .await;

    let res = app
        .client
        .post(app.url("/me/password"))
        .bearer_auth(&access_token)
        .json(&json!({ "current_password": "wrong", "new_password": "newpassword456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = app
        .client
        .post(app.url("/me/password"))
        .bearer_auth(&access_token)
        .json(&json!({ "current_password": "password123", "new_password": "newpassword456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    app.login("user@clinic.test", "newpassword456").await;
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn suspended_users_are_rejected_at_the_guard() {
    let app = TestApp::spawn().await;
    let (access_token, user_id) = app
        .register_and_login("user@clinic.test", "password123")
        .await;

    sqlx::query("UPDATE users SET user_state_code = 'suspended' WHERE user_id = $1")
        .bind(user_id)
        .execute(app.state.db.pool())
        .await
        .unwrap();

    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // And at login.
    let res = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "user@clinic.test", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn missing_or_malformed_bearer_tokens_are_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app.client.get(app.url("/me")).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}
