//! Clinic user model - one row is both the invitation and, once accepted,
//! the membership binding a user to a clinic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Roles a clinic member can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Doctor,
    Reception,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Doctor => "doctor",
            MemberRole::Reception => "reception",
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(MemberRole::Admin),
            "doctor" => Ok(MemberRole::Doctor),
            "reception" => Ok(MemberRole::Reception),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}

/// Derived invitation states. Revocation deletes the row, so it never
/// appears as a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Pending,
    Accepted,
    Expired,
}

impl InvitationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationState::Pending => "pending",
            InvitationState::Accepted => "accepted",
            InvitationState::Expired => "expired",
        }
    }
}

/// Clinic user entity. user_id stays NULL and is_active false until the
/// invitation is accepted. token_hash is retained after acceptance so a
/// replayed token classifies as already accepted instead of not found.
#[derive(Debug, Clone, FromRow)]
pub struct ClinicUser {
    pub clinic_user_id: Uuid,
    pub clinic_id: Uuid,
    pub member_role: String,
    pub user_id: Option<Uuid>,
    pub is_active: bool,
    pub token_hash: String,
    pub invitation_expires_at: DateTime<Utc>,
    pub invited_email: String,
    pub doctor_id: Option<Uuid>,
    pub invited_by: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Invitation validity window in days, applied at issuance and renewal.
pub const INVITATION_EXPIRY_DAYS: i64 = 7;

impl ClinicUser {
    /// Create a new pending invitation.
    pub fn new_invitation(
        clinic_id: Uuid,
        member_role: MemberRole,
        invited_email: String,
        token_hash: String,
        doctor_id: Option<Uuid>,
        invited_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            clinic_user_id: Uuid::new_v4(),
            clinic_id,
            member_role: member_role.as_str().to_string(),
            user_id: None,
            is_active: false,
            token_hash,
            invitation_expires_at: now + Duration::days(INVITATION_EXPIRY_DAYS),
            invited_email,
            doctor_id,
            invited_by,
            accepted_at: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Check if the invitation has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    /// Check if the invitation window has elapsed.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.invitation_expires_at
    }

    /// Derive the lifecycle state.
    pub fn state(&self) -> InvitationState {
        if self.is_accepted() {
            InvitationState::Accepted
        } else if self.is_expired() {
            InvitationState::Expired
        } else {
            InvitationState::Pending
        }
    }
}

/// Request to create an invitation.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub invited_email: String,

    pub member_role: MemberRole,
    pub doctor_id: Option<Uuid>,
}

/// Invitation listing entry with derived state.
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub invitation_id: Uuid,
    pub clinic_id: Uuid,
    pub member_role: String,
    pub invited_email: String,
    pub doctor_id: Option<Uuid>,
    pub invited_by: Option<String>,
    pub state: String,
    pub invitation_expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl From<ClinicUser> for InvitationResponse {
    fn from(cu: ClinicUser) -> Self {
        let state = cu.state().as_str().to_string();
        Self {
            invitation_id: cu.clinic_user_id,
            clinic_id: cu.clinic_id,
            member_role: cu.member_role,
            invited_email: cu.invited_email,
            doctor_id: cu.doctor_id,
            invited_by: cu.invited_by,
            state,
            invitation_expires_at: cu.invitation_expires_at,
            accepted_at: cu.accepted_at,
            created_utc: cu.created_utc,
        }
    }
}

/// Request to accept an invitation.
#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_invitation() -> ClinicUser {
        ClinicUser::new_invitation(
            Uuid::new_v4(),
            MemberRole::Doctor,
            "doc@clinic.test".to_string(),
            "hash".to_string(),
            None,
            Some("owner@clinic.test".to_string()),
        )
    }

    #[test]
    fn new_invitation_is_pending_for_seven_days() {
        let invitation = pending_invitation();
        assert_eq!(invitation.state(), InvitationState::Pending);
        assert!(invitation.user_id.is_none());
        assert!(!invitation.is_active);
        let window = invitation.invitation_expires_at - invitation.created_utc;
        assert_eq!(window.num_days(), INVITATION_EXPIRY_DAYS);
    }

    #[test]
    fn accepted_wins_over_expired_when_classifying() {
        let mut invitation = pending_invitation();
        invitation.accepted_at = Some(Utc::now());
        invitation.invitation_expires_at = Utc::now() - Duration::days(1);
        assert_eq!(invitation.state(), InvitationState::Accepted);
    }

    #[test]
    fn past_expiry_classifies_as_expired() {
        let mut invitation = pending_invitation();
        invitation.invitation_expires_at = Utc::now() - Duration::minutes(1);
        assert_eq!(invitation.state(), InvitationState::Expired);
    }
}
