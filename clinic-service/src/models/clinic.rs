//! Clinic model - tenant root for the clinic-scoped resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Clinic state codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicState {
    Active,
    Archived,
}

impl ClinicState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicState::Active => "active",
            ClinicState::Archived => "archived",
        }
    }
}

/// Clinic entity.
#[derive(Debug, Clone, FromRow)]
pub struct Clinic {
    pub clinic_id: Uuid,
    pub owner_user_id: Uuid,
    pub clinic_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub clinic_state_code: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Clinic {
    /// Create a new clinic owned by the given user.
    pub fn new(
        owner_user_id: Uuid,
        clinic_name: String,
        address: Option<String>,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            clinic_id: Uuid::new_v4(),
            owner_user_id,
            clinic_name,
            address,
            phone,
            clinic_state_code: ClinicState::Active.as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Check if clinic is active (not archived).
    pub fn is_active(&self) -> bool {
        self.clinic_state_code == ClinicState::Active.as_str()
    }
}

/// Request to create a clinic.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClinicRequest {
    #[validate(length(min = 1, max = 200, message = "Clinic name must be 1-200 characters"))]
    pub clinic_name: String,

    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Request to update a clinic.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClinicRequest {
    #[validate(length(min = 1, max = 200, message = "Clinic name must be 1-200 characters"))]
    pub clinic_name: Option<String>,

    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Clinic response for API.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicResponse {
    pub clinic_id: Uuid,
    pub owner_user_id: Uuid,
    pub clinic_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub clinic_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Clinic> for ClinicResponse {
    fn from(c: Clinic) -> Self {
        Self {
            clinic_id: c.clinic_id,
            owner_user_id: c.owner_user_id,
            clinic_name: c.clinic_name,
            address: c.address,
            phone: c.phone,
            clinic_state_code: c.clinic_state_code,
            created_utc: c.created_utc,
        }
    }
}
