//! Session context model - the server-derived projection of who the caller
//! is and which clinics they can act in. Recomputed per request, never
//! cached server-side.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::clinic::Clinic;
use super::profile::{AppRole, Profile};

/// Accepted membership joined with its clinic, as loaded for context
/// derivation and the route guard.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipDetail {
    pub clinic_user_id: Uuid,
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub member_role: String,
    pub doctor_id: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// One clinic the caller can act in.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicContext {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub doctor_id: Option<Uuid>,
}

/// Full session context.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub user_type: String,
    pub active_clinic: Option<ClinicContext>,
    pub user_clinics: Vec<ClinicContext>,
}

impl SessionContext {
    /// Project profile, accepted memberships, and owned clinics into the
    /// context shape. Membership order decides the active clinic; owners
    /// fall back to their first clinic with the host role.
    pub fn derive(profile: &Profile, memberships: &[MembershipDetail], owned: &[Clinic]) -> Self {
        let user_clinics: Vec<ClinicContext> = memberships
            .iter()
            .map(|m| ClinicContext {
                id: m.clinic_id,
                name: m.clinic_name.clone(),
                role: m.member_role.clone(),
                doctor_id: m.doctor_id,
            })
            .collect();

        let active_clinic = user_clinics.first().cloned().or_else(|| {
            owned.first().map(|c| ClinicContext {
                id: c.clinic_id,
                name: c.clinic_name.clone(),
                role: AppRole::Host.as_str().to_string(),
                doctor_id: None,
            })
        });

        Self {
            user_type: profile.app_role.clone(),
            active_clinic,
            user_clinics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_profile() -> Profile {
        Profile::new(Uuid::new_v4())
    }

    fn membership(role: &str) -> MembershipDetail {
        MembershipDetail {
            clinic_user_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            clinic_name: "North Clinic".to_string(),
            member_role: role.to_string(),
            doctor_id: Some(Uuid::new_v4()),
            accepted_at: Some(Utc::now()),
        }
    }

    #[test]
    fn empty_context_has_no_active_clinic() {
        let context = SessionContext::derive(&host_profile(), &[], &[]);
        assert_eq!(context.user_type, "host");
        assert!(context.active_clinic.is_none());
        assert!(context.user_clinics.is_empty());
    }

    #[test]
    fn first_membership_becomes_active_clinic() {
        let mut profile = host_profile();
        profile.app_role = "doctor".to_string();
        let memberships = vec![membership("doctor"), membership("reception")];

        let context = SessionContext::derive(&profile, &memberships, &[]);

        assert_eq!(context.user_type, "doctor");
        assert_eq!(context.user_clinics.len(), 2);
        let active = context.active_clinic.expect("active clinic");
        assert_eq!(active.id, memberships[0].clinic_id);
        assert_eq!(active.role, "doctor");
        assert_eq!(active.doctor_id, memberships[0].doctor_id);
    }

    #[test]
    fn owner_without_memberships_falls_back_to_owned_clinic() {
        let profile = host_profile();
        let clinic = Clinic::new(profile.user_id, "Main St Clinic".to_string(), None, None);

        let context = SessionContext::derive(&profile, &[], &[clinic.clone()]);

        assert!(context.user_clinics.is_empty());
        let active = context.active_clinic.expect("active clinic");
        assert_eq!(active.id, clinic.clinic_id);
        assert_eq!(active.role, "host");
        assert!(active.doctor_id.is_none());
    }

    #[test]
    fn membership_wins_over_owned_clinic() {
        let profile = host_profile();
        let clinic = Clinic::new(profile.user_id, "Owned".to_string(), None, None);
        let memberships = vec![membership("reception")];

        let context = SessionContext::derive(&profile, &memberships, &[clinic]);

        let active = context.active_clinic.expect("active clinic");
        assert_eq!(active.id, memberships[0].clinic_id);
        assert_eq!(active.role, "reception");
    }
}
