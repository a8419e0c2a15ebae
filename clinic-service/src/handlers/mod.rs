pub mod api_keys;
pub mod auth;
pub mod clinic;
pub mod doctor;
pub mod exam;
pub mod invitation;
pub mod medical_record;
pub mod metrics;
pub mod patient;
pub mod registrations;
pub mod user;

use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::models::{Clinic, MemberRole};
use crate::AppState;
use service_core::error::AppError;

/// Load a clinic or answer 404.
pub(crate) async fn load_clinic(state: &AppState, clinic_id: Uuid) -> Result<Clinic, AppError> {
    state
        .db
        .find_clinic_by_id(clinic_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Clinic not found")))
}

/// The caller's role within a clinic, derived from ownership or an accepted
/// membership. Client-side context never substitutes for these checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClinicAccess {
    Owner,
    Member(MemberRole),
}

/// Resolve the caller's access to a clinic, or answer 403.
pub(crate) async fn ensure_member_access(
    state: &AppState,
    current: &CurrentUser,
    clinic: &Clinic,
) -> Result<ClinicAccess, AppError> {
    if clinic.owner_user_id == current.user_id() {
        return Ok(ClinicAccess::Owner);
    }

    let membership = state
        .db
        .find_membership_for_user_in_clinic(current.user_id(), clinic.clinic_id)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden(anyhow::anyhow!("You do not have access to this clinic"))
        })?;

    let role = membership
        .member_role
        .parse::<MemberRole>()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

    Ok(ClinicAccess::Member(role))
}

/// Require operator access: the clinic owner or an accepted admin member.
pub(crate) async fn ensure_operator_access(
    state: &AppState,
    current: &CurrentUser,
    clinic: &Clinic,
) -> Result<ClinicAccess, AppError> {
    match ensure_member_access(state, current, clinic).await? {
        access @ (ClinicAccess::Owner | ClinicAccess::Member(MemberRole::Admin)) => Ok(access),
        ClinicAccess::Member(_) => Err(AppError::Forbidden(anyhow::anyhow!(
            "Operator access to this clinic is required"
        ))),
    }
}
