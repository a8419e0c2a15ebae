//! Medical record model - consultation notes per patient visit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Medical record entity.
#[derive(Debug, Clone, FromRow)]
pub struct MedicalRecord {
    pub record_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub record_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl MedicalRecord {
    /// Create a new medical record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clinic_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        record_date: NaiveDate,
        chief_complaint: Option<String>,
        diagnosis: Option<String>,
        prescription: Option<String>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            record_id: Uuid::new_v4(),
            clinic_id,
            patient_id,
            doctor_id,
            record_date,
            chief_complaint,
            diagnosis,
            prescription,
            notes,
            created_utc: now,
            updated_utc: now,
        }
    }
}

/// Request to create a medical record.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicalRecordRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub record_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

/// Request to update a medical record.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMedicalRecordRequest {
    pub record_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

/// Query parameters for listing medical records.
#[derive(Debug, Deserialize)]
pub struct ListMedicalRecordsQuery {
    pub patient_id: Option<Uuid>,
}

/// Medical record response for API.
#[derive(Debug, Clone, Serialize)]
pub struct MedicalRecordResponse {
    pub record_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub record_date: NaiveDate,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<MedicalRecord> for MedicalRecordResponse {
    fn from(r: MedicalRecord) -> Self {
        Self {
            record_id: r.record_id,
            clinic_id: r.clinic_id,
            patient_id: r.patient_id,
            doctor_id: r.doctor_id,
            record_date: r.record_date,
            chief_complaint: r.chief_complaint,
            diagnosis: r.diagnosis,
            prescription: r.prescription,
            notes: r.notes,
            created_utc: r.created_utc,
        }
    }
}
