//! Invitation lifecycle handlers.
//!
//! One `clinic_users` row carries an invitation from issuance through
//! renewal to acceptance (or revocation). Issuance and renewal are operator
//! actions scoped under the clinic; resolution is public; acceptance is an
//! authenticated action that grants membership transactionally.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::{ensure_operator_access, load_clinic};
use crate::middleware::CurrentUser;
use crate::models::{
    AcceptInvitationRequest, ClinicUser, CreateInvitationRequest, InvitationResponse,
    SessionContext, INVITATION_EXPIRY_DAYS,
};
use crate::utils::{generate_opaque_token, hash_token, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

/// Response after creating or renewing an invitation. The plaintext token
/// appears here exactly once; only its hash is stored.
#[derive(Debug, Serialize)]
pub struct CreateInvitationResponse {
    pub invitation_id: Uuid,
    pub invite_token: String,
    pub invite_url: String,
    pub invitation_expires_at: DateTime<Utc>,
}

/// Invitation details for the public accept page. Read-only projection;
/// resolving never mutates the record.
#[derive(Debug, Serialize)]
pub struct InvitationDetailsResponse {
    pub invitation_id: Uuid,
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub member_role: String,
    pub invited_email: String,
    pub invited_by: Option<String>,
    pub invitation_expires_at: DateTime<Utc>,
    pub state: String,
}

/// Response after accepting an invitation, including the recomputed
/// session context so the client can refresh its navigation immediately.
#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub invitation_id: Uuid,
    pub clinic_id: Uuid,
    pub role: String,
    pub accepted_at: DateTime<Utc>,
    pub user_email: String,
    pub context: SessionContext,
}

/// The invite URL contract: the query parameter name is `token`.
fn build_invite_url(base_url: &str, token: &str) -> String {
    format!("{}/InviteAccept?token={}", base_url, token)
}

/// Create a new invitation.
///
/// POST /clinics/{clinic_id}/invitations
#[tracing::instrument(skip(state, current, req), fields(clinic_id = %clinic_id))]
pub async fn create_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreateInvitationResponse>), AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    if !clinic.is_active() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Cannot invite members to an archived clinic"
        )));
    }

    if let Some(doctor_id) = req.doctor_id {
        let doctor = state
            .db
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Doctor not found")))?;
        if doctor.clinic_id != clinic_id {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Doctor does not belong to this clinic"
            )));
        }
    }

    let token = generate_opaque_token();
    let invitation = ClinicUser::new_invitation(
        clinic_id,
        req.member_role,
        req.invited_email.clone(),
        hash_token(&token),
        req.doctor_id,
        Some(current.email().to_string()),
    );

    // The partial unique index rejects a second open invitation for the
    // same (clinic, email, role); insert_clinic_user maps that to 409.
    state.db.insert_clinic_user(&invitation).await?;

    let invite_url = build_invite_url(&state.config.frontend.base_url, &token);

    // Delivery is best-effort: operators distribute the link out-of-band
    // anyway, so a mail failure must not fail issuance.
    if let Err(e) = state
        .email
        .send_invitation_email(
            &req.invited_email,
            &clinic.clinic_name,
            req.member_role.as_str(),
            &invite_url,
        )
        .await
    {
        tracing::warn!(
            invitation_id = %invitation.clinic_user_id,
            error = %e,
            "Invitation email delivery failed"
        );
    }

    tracing::info!(
        invitation_id = %invitation.clinic_user_id,
        invited_email = %req.invited_email,
        member_role = %req.member_role.as_str(),
        "Invitation created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            invitation_id: invitation.clinic_user_id,
            invite_token: token,
            invite_url,
            invitation_expires_at: invitation.invitation_expires_at,
        }),
    ))
}

/// Renew an invitation: replace the token and restart the expiry window on
/// the same record. Every previously issued token stops resolving.
///
/// POST /clinics/{clinic_id}/invitations/{invitation_id}/renew
#[tracing::instrument(skip(state, current), fields(clinic_id = %clinic_id, invitation_id = %invitation_id))]
pub async fn renew_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CreateInvitationResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    let invitation = state
        .db
        .find_clinic_user_by_id(invitation_id)
        .await?
        .filter(|cu| cu.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    if invitation.is_accepted() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Invitation has already been accepted"
        )));
    }

    let token = generate_opaque_token();
    let expires_at = Utc::now() + Duration::days(INVITATION_EXPIRY_DAYS);

    let renewed = state
        .db
        .renew_invitation(invitation_id, &hash_token(&token), expires_at)
        .await?
        .ok_or_else(|| {
            // Accepted between the read above and the guarded update.
            AppError::Conflict(anyhow::anyhow!("Invitation has already been accepted"))
        })?;

    tracing::info!(invitation_id = %invitation_id, "Invitation renewed");

    Ok(Json(CreateInvitationResponse {
        invitation_id: renewed.clinic_user_id,
        invite_url: build_invite_url(&state.config.frontend.base_url, &token),
        invite_token: token,
        invitation_expires_at: renewed.invitation_expires_at,
    }))
}

/// List a clinic's invitations with their derived states.
///
/// GET /clinics/{clinic_id}/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    let invitations = state.db.find_invitations_by_clinic(clinic_id).await?;
    Ok(Json(
        invitations.into_iter().map(InvitationResponse::from).collect(),
    ))
}

/// Revoke an invitation or membership: hard delete.
///
/// DELETE /clinics/{clinic_id}/invitations/{invitation_id}
#[tracing::instrument(skip(state, current), fields(clinic_id = %clinic_id, invitation_id = %invitation_id))]
pub async fn revoke_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    state
        .db
        .find_clinic_user_by_id(invitation_id)
        .await?
        .filter(|cu| cu.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    if state.db.delete_clinic_user(invitation_id).await? {
        tracing::info!(invitation_id = %invitation_id, "Invitation revoked");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Resolve an invitation by token for display. Public; single indexed
/// lookup by token hash.
///
/// GET /invitations/{token}
#[tracing::instrument(skip_all)]
pub async fn resolve_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationDetailsResponse>, AppError> {
    let invitation = state
        .db
        .find_clinic_user_by_token_hash(&hash_token(&token))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    let clinic = load_clinic(&state, invitation.clinic_id).await?;

    Ok(Json(InvitationDetailsResponse {
        invitation_id: invitation.clinic_user_id,
        clinic_id: invitation.clinic_id,
        clinic_name: clinic.clinic_name,
        member_role: invitation.member_role.clone(),
        invited_email: invitation.invited_email.clone(),
        invited_by: invitation.invited_by.clone(),
        invitation_expires_at: invitation.invitation_expires_at,
        state: invitation.state().as_str().to_string(),
    }))
}

/// Accept an invitation as the authenticated caller.
///
/// POST /invitations/accept
///
/// Validation order: not found, already accepted, expired, email mismatch.
/// The grant itself (bind user, activate membership, upsert profile role
/// and clinic list) is a single transaction; partial acceptance cannot
/// escape it.
#[tracing::instrument(skip_all, fields(user_id = %current.user_id()))]
pub async fn accept_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, AppError> {
    let invitation = state
        .db
        .find_clinic_user_by_token_hash(&hash_token(&req.token))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    if invitation.is_accepted() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Invitation has already been accepted"
        )));
    }

    if invitation.is_expired() {
        return Err(AppError::Gone(anyhow::anyhow!(
            "Invitation has expired; ask the clinic to renew it"
        )));
    }

    // Exact comparison: the invite is addressed to one identity.
    if current.email() != invitation.invited_email {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Invitation is addressed to a different email"
        )));
    }

    let accepted = state
        .db
        .accept_invitation_grant(invitation.clinic_user_id, current.user_id())
        .await?
        .ok_or_else(|| {
            // A concurrent acceptance won the guarded update.
            AppError::Conflict(anyhow::anyhow!("Invitation has already been accepted"))
        })?;

    let accepted_at = accepted.accepted_at.unwrap_or_else(Utc::now);

    // Context is a pure projection of committed state; always safe to
    // recompute after the grant.
    let profile = state
        .db
        .find_profile(current.user_id())
        .await?
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Profile missing after grant")))?;
    let memberships = state.db.find_memberships_for_user(current.user_id()).await?;
    let owned = state.db.find_clinics_owned_by(current.user_id()).await?;
    let context = SessionContext::derive(&profile, &memberships, &owned);

    tracing::info!(
        invitation_id = %accepted.clinic_user_id,
        clinic_id = %accepted.clinic_id,
        role = %accepted.member_role,
        "Invitation accepted"
    );

    Ok(Json(AcceptInvitationResponse {
        invitation_id: accepted.clinic_user_id,
        clinic_id: accepted.clinic_id,
        role: accepted.member_role,
        accepted_at,
        user_email: current.email().to_string(),
        context,
    }))
}
