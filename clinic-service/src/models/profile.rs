//! Profile model - application role and materialized clinic membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Application role codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    Admin,
    Host,
    Doctor,
    Reception,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Host => "host",
            AppRole::Doctor => "doctor",
            AppRole::Reception => "reception",
        }
    }
}

impl std::str::FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(AppRole::Admin),
            "host" => Ok(AppRole::Host),
            "doctor" => Ok(AppRole::Doctor),
            "reception" => Ok(AppRole::Reception),
            _ => Err(format!("Invalid app role: {}", s)),
        }
    }
}

/// Profile entity. Provisioned lazily by the route guard; clinic_ids mirrors
/// accepted memberships and is written in the same transaction that accepts
/// or revokes them.
#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub app_role: String,
    pub clinic_ids: Vec<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile with the default host role.
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            app_role: AppRole::Host.as_str().to_string(),
            clinic_ids: Vec::new(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Check if the profile carries the platform admin role.
    pub fn is_admin(&self) -> bool {
        self.app_role == AppRole::Admin.as_str()
    }
}

/// Profile response for API.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub app_role: String,
    pub clinic_ids: Vec<Uuid>,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            user_id: p.user_id,
            app_role: p.app_role,
            clinic_ids: p.clinic_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn new_profile_defaults_to_host() {
        let profile = Profile::new(Uuid::new_v4());
        assert_eq!(profile.app_role, "host");
        assert!(profile.clinic_ids.is_empty());
        assert!(!profile.is_admin());
    }

    #[test]
    fn app_role_parses_case_insensitively() {
        assert_eq!(AppRole::from_str("Doctor").unwrap(), AppRole::Doctor);
        assert_eq!(AppRole::from_str("ADMIN").unwrap(), AppRole::Admin);
        assert!(AppRole::from_str("owner").is_err());
    }
}
