//! Integration tests for the invitation lifecycle: issuance, resolution,
//! renewal, acceptance, replay, expiry, and revocation.

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn invitation_resolves_publicly_while_pending() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    // No auth header: resolution is public.
    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", invite_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "pending");
    assert_eq!(body["clinic_name"], "North Clinic");
    assert_eq!(body["member_role"], "doctor");
    assert_eq!(body["invited_email"], "doc@clinic.test");
    assert_eq!(body["invited_by"], "owner@clinic.test");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn invite_url_carries_the_token_as_query_param() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let res = app
        .client
        .post(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&owner_token)
        .json(&json!({ "invited_email": "doc@clinic.test", "member_role": "doctor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();

    let token = body["invite_token"].as_str().unwrap();
    let url = body["invite_url"].as_str().unwrap();
    assert_eq!(
        url,
        format!("http://localhost:3000/InviteAccept?token={}", token)
    );

    // The mock records the invite URL that went out by email.
    assert_eq!(
        app.email.last_token_for("doc@clinic.test", "invitation"),
        Some(url.to_string())
    );
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn second_open_invitation_for_same_email_and_role_conflicts() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    app.invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    let res = app
        .client
        .post(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&owner_token)
        .json(&json!({ "invited_email": "DOC@clinic.test", "member_role": "doctor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);

    // A different role for the same address is a separate invitation.
    let res = app
        .client
        .post(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&owner_token)
        .json(&json!({ "invited_email": "doc@clinic.test", "member_role": "reception" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn renewal_rotates_the_token_and_restarts_the_window() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (invitation_id, old_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    let res = app
        .client
        .post(app.url(&format!(
            "/clinics/{}/invitations/{}/renew",
            clinic_id, invitation_id
        )))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let new_token = body["invite_token"].as_str().unwrap();
    assert_ne!(new_token, old_token);

    // The old token stops resolving; the new one works.
    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", old_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", new_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn renewal_invalidates_every_previously_issued_token() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (invitation_id, first_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    let renew = || {
        app.client
            .post(app.url(&format!(
                "/clinics/{}/invitations/{}/renew",
                clinic_id, invitation_id
            )))
            .bearer_auth(&owner_token)
            .send()
    };

    let res = renew().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let second_token = body["invite_token"].as_str().unwrap().to_string();

    let res = renew().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let third_token = body["invite_token"].as_str().unwrap().to_string();

    // Only the latest token is live; each renewal kills all predecessors.
    for stale in [&first_token, &second_token] {
        let res = app
            .client
            .get(app.url(&format!("/invitations/{}", stale)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 404);
    }

    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", third_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn accepting_an_unknown_token_is_not_found_and_mutates_nothing() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;
    let (doc_token, _) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;

    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": "0000000000000000000000000000000000000000000000000000000000000000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // The real invitation is untouched and still accepts.
    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", invite_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "pending");

    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn acceptance_requires_the_invited_email() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    let (intruder_token, _) = app
        .register_and_login("other@clinic.test", "password123")
        .await;

    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&intruder_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn acceptance_grants_membership_and_returns_context() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    let (doc_token, doc_user_id) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;

    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["clinic_id"], clinic_id.to_string());
    assert_eq!(body["role"], "doctor");
    assert_eq!(body["user_email"], "doc@clinic.test");
    assert!(body["accepted_at"].is_string());

    // Context reflects the new membership immediately.
    assert_eq!(body["context"]["active_clinic"]["id"], clinic_id.to_string());
    assert_eq!(body["context"]["active_clinic"]["role"], "doctor");

    // The member can now read clinic data.
    let res = app
        .client
        .get(app.url(&format!("/clinics/{}/patients", clinic_id)))
        .bearer_auth(&doc_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // The profile mirrors the accepted membership.
    let profile: Option<(Vec<uuid::Uuid>,)> =
        sqlx::query_as("SELECT clinic_ids FROM profiles WHERE user_id = $1")
            .bind(doc_user_id)
            .fetch_optional(app.state.db.pool())
            .await
            .unwrap();
    assert_eq!(profile.unwrap().0, vec![clinic_id]);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn replayed_acceptance_conflicts_and_resolve_reports_accepted() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (_, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;
    let (doc_token, _) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;

    let accept = |token: String| {
        app.client
            .post(app.url("/invitations/accept"))
            .bearer_auth(&doc_token)
            .json(&json!({ "token": token }))
            .send()
    };

    assert_eq!(accept(invite_token.clone()).await.unwrap().status(), 200);
    // The token hash is retained, so a replay classifies as accepted
    // rather than not found.
    assert_eq!(accept(invite_token.clone()).await.unwrap().status(), 409);

    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", invite_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "accepted");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn expired_invitation_is_gone_until_renewed() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (invitation_id, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;

    sqlx::query(
        "UPDATE clinic_users SET invitation_expires_at = NOW() - INTERVAL '1 day' WHERE clinic_user_id = $1",
    )
    .bind(invitation_id)
    .execute(app.state.db.pool())
    .await
    .unwrap();

    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", invite_token)))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "expired");

    let (doc_token, _) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;
    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 410);

    // Renewal reopens the same record with a fresh token.
    let res = app
        .client
        .post(app.url(&format!(
            "/clinics/{}/invitations/{}/renew",
            clinic_id, invitation_id
        )))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let new_token = body["invite_token"].as_str().unwrap();

    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": new_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn renewing_an_accepted_invitation_conflicts() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (invitation_id, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;
    let (doc_token, _) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;
    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = app
        .client
        .post(app.url(&format!(
            "/clinics/{}/invitations/{}/renew",
            clinic_id, invitation_id
        )))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn revocation_deletes_the_invitation_and_any_membership() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    let (invitation_id, invite_token) = app
        .invite(&owner_token, clinic_id, "doc@clinic.test", "doctor")
        .await;
    let (doc_token, _) = app
        .register_and_login("doc@clinic.test", "password123")
        .await;
    let res = app
        .client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&doc_token)
        .json(&json!({ "token": invite_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = app
        .client
        .delete(app.url(&format!(
            "/clinics/{}/invitations/{}",
            clinic_id, invitation_id
        )))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    // The token no longer resolves and the membership is gone.
    let res = app
        .client
        .get(app.url(&format!("/invitations/{}", invite_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = app
        .client
        .get(app.url(&format!("/clinics/{}/patients", clinic_id)))
        .bearer_auth(&doc_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn only_operators_can_manage_invitations() {
    let app = TestApp::spawn().await;
    let (owner_token, _) = app.register_and_login("owner@clinic.test", "password123").await;
    let clinic_id = app.create_clinic(&owner_token, "North Clinic").await;

    // Reception member: can read clinic data but not manage invitations.
    let (_, reception_invite) = app
        .invite(&owner_token, clinic_id, "desk@clinic.test", "reception")
        .await;
    let (reception_token, _) = app
        .register_and_login("desk@clinic.test", "password123")
        .await;
    app.client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&reception_token)
        .json(&json!({ "token": reception_invite }))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .post(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&reception_token)
        .json(&json!({ "invited_email": "x@clinic.test", "member_role": "doctor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // Admin member: full invitation management.
    let (_, admin_invite) = app
        .invite(&owner_token, clinic_id, "admin@clinic.test", "admin")
        .await;
    let (admin_token, _) = app
        .register_and_login("admin@clinic.test", "password123")
        .await;
    app.client
        .post(app.url("/invitations/accept"))
        .bearer_auth(&admin_token)
        .json(&json!({ "token": admin_invite }))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .post(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "invited_email": "x@clinic.test", "member_role": "doctor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let res = app
        .client
        .get(app.url(&format!("/clinics/{}/invitations", clinic_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 3);
}
