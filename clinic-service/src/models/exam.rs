//! Exam model - requested examinations and their outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Exam status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Requested,
    Completed,
    Cancelled,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Requested => "requested",
            ExamStatus::Completed => "completed",
            ExamStatus::Cancelled => "cancelled",
        }
    }

    /// Valid transitions: requested may complete or cancel, terminal states
    /// stay put.
    pub fn can_transition_to(&self, next: ExamStatus) -> bool {
        matches!(
            (self, next),
            (ExamStatus::Requested, ExamStatus::Completed)
                | (ExamStatus::Requested, ExamStatus::Cancelled)
        )
    }
}

impl std::str::FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "requested" => Ok(ExamStatus::Requested),
            "completed" => Ok(ExamStatus::Completed),
            "cancelled" => Ok(ExamStatus::Cancelled),
            _ => Err(format!("Invalid exam status: {}", s)),
        }
    }
}

/// Exam entity.
#[derive(Debug, Clone, FromRow)]
pub struct Exam {
    pub exam_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub exam_type: String,
    pub exam_status_code: String,
    pub requested_utc: DateTime<Utc>,
    pub performed_utc: Option<DateTime<Utc>>,
    pub result_summary: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Exam {
    /// Create a new requested exam.
    pub fn new(clinic_id: Uuid, patient_id: Uuid, doctor_id: Option<Uuid>, exam_type: String) -> Self {
        let now = Utc::now();
        Self {
            exam_id: Uuid::new_v4(),
            clinic_id,
            patient_id,
            doctor_id,
            exam_type,
            exam_status_code: ExamStatus::Requested.as_str().to_string(),
            requested_utc: now,
            performed_utc: None,
            result_summary: None,
            created_utc: now,
            updated_utc: now,
        }
    }
}

/// Request to create an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Exam type must be 1-200 characters"))]
    pub exam_type: String,
}

/// Request to update an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    pub status: Option<ExamStatus>,
    pub doctor_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Exam type must be 1-200 characters"))]
    pub exam_type: Option<String>,

    pub result_summary: Option<String>,
}

/// Query parameters for listing exams.
#[derive(Debug, Deserialize)]
pub struct ListExamsQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<ExamStatus>,
}

/// Exam response for API.
#[derive(Debug, Clone, Serialize)]
pub struct ExamResponse {
    pub exam_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub exam_type: String,
    pub exam_status_code: String,
    pub requested_utc: DateTime<Utc>,
    pub performed_utc: Option<DateTime<Utc>>,
    pub result_summary: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Exam> for ExamResponse {
    fn from(e: Exam) -> Self {
        Self {
            exam_id: e.exam_id,
            clinic_id: e.clinic_id,
            patient_id: e.patient_id,
            doctor_id: e.doctor_id,
            exam_type: e.exam_type,
            exam_status_code: e.exam_status_code,
            requested_utc: e.requested_utc,
            performed_utc: e.performed_utc,
            result_summary: e.result_summary,
            created_utc: e.created_utc,
        }
    }
}
