//! Integration tests for clinic management, membership-based access
//! control, and the caller's profile and session context.

mod common;

use common::TestApp;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn clinic_crud_round_trip() {
    let app = TestApp::spawn().await;
    let (token, user_id) = app.register_and_login("owner@clinic.test", "password123").await;

    let clinic_id = app.create_clinic(&token, "North Clinic").await;

    let res = app
        .client
        .get(app.url("/clinics"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["owner_user_id"], user_id.to_string());

    let res = app
        .client
        .patch(app.url(&format!("/clinics/{}", clinic_id)))
        .bearer_auth(&token)
        .json(&json!({ "clinic_name": "North Clinic (renamed)", "address": "12 Harbor St" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["clinic_name"], "North Clinic (renamed)");
    assert_eq!(body["address"], "12 Harbor St");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn non_members_cannot_see_a_clinic() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (outsider_token, _) = app
        .register_and_login("outsider@clinic.test", "password123")
        .await;

    let res = app
        .client
        .get(app.url(&format!("/clinics/{}", clinic_id)))
        .bearer_auth(&outsider_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // Unknown clinics answer 404, not 403.
    let res = app
        .client
        .get(app.url(&format!("/clinics/{}", Uuid::new_v4())))
        .bearer_auth(&outsider_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn only_the_owner_can_archive_a_clinic() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    // Even an admin member is refused.
    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "admin@clinic.test", "admin")
        .await;
    let (admin_token, _) = app
        .register_and_login("admin@clinic.test", "password123")
        .await;
    app.client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&admin_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .delete(app.url(&format!("/clinics/{}", clinic_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = app
        .client
        .delete(app.url(&format!("/clinics/{}", clinic_id)))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    // Archived clinics refuse new invitations.
    let res = app
        .client
        .post(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&owner_token)
        .json(&json!({ "invited_email": "late@clinic.test", "member_role": "doctor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn me_returns_the_lazily_provisioned_profile() {
    let app = TestApp::spawn().await;
    let (token, user_id) = app.register_and_login("user@clinic.test", "password123").await;

    let res = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["user_id"], user_id.to_string());
    assert_eq!(body["user"]["email"], "user@clinic.test");
    assert_eq!(body["profile"]["app_role"], "host");
    assert_eq!(body["profile"]["clinic_ids"], json!([]));

    let res = app
        .client
        .patch(app.url("/me"))
        .bearer_auth(&token)
        .json(&json!({ "full_name": "Renamed User" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["full_name"], "Renamed User");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn concurrent_first_requests_provision_a_single_profile() {
    let app = TestApp::spawn().await;
    let (token, user_id) = app.register_and_login("user@clinic.test", "password123").await;

    // Two tabs landing at once on a fresh account: both guards race to
    // provision the profile.
    let first = app.client.get(app.url("/me")).bearer_auth(&token).send();
    let second = app.client.get(app.url("/me")).bearer_auth(&token).send();
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap().status(), 200);
    assert_eq!(second.unwrap().status(), 200);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(app.state.db.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn probe_user_agents_reach_health_and_metrics() {
    let app = TestApp::spawn().await;

    for agent in ["ELB-HealthChecker/2.0", "curl/8.0", "Go-http-client/1.1"] {
        for path in ["/health", "/metrics"] {
            let res = app
                .client
                .get(app.url(path))
                .header("User-Agent", agent)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), 200, "{} blocked on {}", agent, path);
        }

        // The same agents stay blocked on the rest of the surface.
        let res = app
            .client
            .post(app.url("/registrations"))
            .header("User-Agent", agent)
            .json(&json!({ "full_name": "Bot", "email": "bot@clinic.test" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 403, "{} admitted on /registrations", agent);
    }
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn session_context_tracks_ownership_and_membership() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;

    // No clinics yet: no active clinic.
    let res = app
        .client
        .get(app.url("/me/context"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body["active_clinic"].is_null());

    // Owners get their clinic as the active one with the host role.
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;
    let res = app
        .client
        .get(app.url("/me/context"))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["active_clinic"]["id"], clinic_id.to_string());
    assert_eq!(body["active_clinic"]["role"], "host");

    // Members get their membership role.
    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;
    let (doc_token, _) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;
    app.client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .get(app.url("/me/context"))
        .bearer_auth(&doc_token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["active_clinic"]["id"], clinic_id.to_string());
    assert_eq!(body["active_clinic"]["role"], "doctor");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn members_read_while_operators_write() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "desk@clinic.test", "reception")
        .await;
    let (reception_token, _) = app
        .register_and_login("desk@clinic.test", "password123")
        .await;
    app.client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&reception_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();

    // Reading clinic data is open to any accepted member.
    let res = app
        .client
        .get(app.url(&format!("/clinics/{}", clinic_id)))
        .bearer_auth(&reception_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Updating clinic settings is not.
    let res = app
        .client
        .patch(app.url(&format!("/clinics/{}", clinic_id)))
        .bearer_auth(&reception_token)
        .json(&json!({ "clinic_name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn api_keys_are_returned_once_and_scoped_to_the_caller() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_and_login("user@clinic.test", "password123").await;

    let res = app
        .client
        .post(app.url("/me/api-keys"))
        .bearer_auth(&token)
        .json(&json!({ "key_label": "ci" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let created: Value = res.json().await.unwrap();
    assert!(created["api_key"].is_string());
    let key_id = created["api_key_id"].as_str().unwrap().to_string();

    // The listing never repeats the plaintext key.
    let res = app
        .client
        .get(app.url("/me/api-keys"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let listed = &body.as_array().unwrap()[0];
    assert_eq!(listed["api_key_id"], key_id.as_str());
    assert!(listed.get("api_key").is_none());

    // Another user revoking the key sees 404, not 403.
    let (other_token, _) = app
        .register_and_login("other@clinic.test", "password123")
        .await;
    let res = app
        .client
        .delete(app.url(&format!("/me/api-keys/{}", key_id)))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = app
        .client
        .delete(app.url(&format!("/me/api-keys/{}", key_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn registration_listing_is_platform_admin_only() {
    let app = TestApp::spawn().await;

    // Submitting interest needs no account.
    let res = app
        .client
        .post(app.url("/registrations"))
        .json(&json!({
            "full_name": "Curious Clinician",
            "email": "curious@clinic.test",
            "clinic_name": "Maybe Clinic"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let (token, user_id) = app.register_and_login("host@clinic.test", "password123").await;

    // Hosts are not platform admins.
    let res = app
        .client
        .get(app.url("/admin/registrations"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // Provision /me first so the profile row exists, then promote it.
    app.client
        .get(app.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    sqlx::query("UPDATE profiles SET app_role = 'admin' WHERE user_id = $1")
        .bind(user_id)
        .execute(app.state.db.pool())
        .await
        .unwrap();

    let res = app
        .client
        .get(app.url("/admin/registrations"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["email"], "curious@clinic.test");
}
