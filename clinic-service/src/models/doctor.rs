//! Doctor model - practitioners attached to a clinic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Doctor entity.
#[derive(Debug, Clone, FromRow)]
pub struct Doctor {
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Doctor {
    /// Create a new active doctor.
    pub fn new(
        clinic_id: Uuid,
        full_name: String,
        specialty: Option<String>,
        license_number: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            doctor_id: Uuid::new_v4(),
            clinic_id,
            full_name,
            specialty,
            license_number,
            email,
            phone,
            is_active: true,
            created_utc: now,
            updated_utc: now,
        }
    }
}

/// Request to create a doctor.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDoctorRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: String,

    pub specialty: Option<String>,
    pub license_number: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
}

/// Request to update a doctor. revoke_system_access additionally deletes the
/// doctor's clinic_users row (pending invitation or accepted membership).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDoctorRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: Option<String>,

    pub specialty: Option<String>,
    pub license_number: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub revoke_system_access: Option<bool>,
}

/// Doctor response for API.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorResponse {
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Doctor> for DoctorResponse {
    fn from(d: Doctor) -> Self {
        Self {
            doctor_id: d.doctor_id,
            clinic_id: d.clinic_id,
            full_name: d.full_name,
            specialty: d.specialty,
            license_number: d.license_number,
            email: d.email,
            phone: d.phone,
            is_active: d.is_active,
            created_utc: d.created_utc,
        }
    }
}
