//! Patient model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Patient entity.
#[derive(Debug, Clone, FromRow)]
pub struct Patient {
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Patient {
    /// Create a new patient.
    pub fn new(
        clinic_id: Uuid,
        full_name: String,
        email: Option<String>,
        phone: Option<String>,
        birth_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            patient_id: Uuid::new_v4(),
            clinic_id,
            full_name,
            email,
            phone,
            birth_date,
            notes,
            created_utc: now,
            updated_utc: now,
        }
    }
}

/// Request to create a patient.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request to update a patient.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePatientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Query parameters for listing patients.
#[derive(Debug, Deserialize)]
pub struct ListPatientsQuery {
    pub search: Option<String>,
}

/// Patient response for API.
#[derive(Debug, Clone, Serialize)]
pub struct PatientResponse {
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Patient> for PatientResponse {
    fn from(p: Patient) -> Self {
        Self {
            patient_id: p.patient_id,
            clinic_id: p.clinic_id,
            full_name: p.full_name,
            email: p.email,
            phone: p.phone,
            birth_date: p.birth_date,
            notes: p.notes,
            created_utc: p.created_utc,
        }
    }
}
