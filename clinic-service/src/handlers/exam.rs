//! Exam handlers, scoped under a clinic.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::handlers::{ensure_member_access, load_clinic};
use crate::middleware::CurrentUser;
use crate::models::{
    CreateExamRequest, Exam, ExamResponse, ExamStatus, ListExamsQuery, UpdateExamRequest,
};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

async fn load_exam(state: &AppState, clinic_id: Uuid, exam_id: Uuid) -> Result<Exam, AppError> {
    state
        .db
        .find_exam_by_id(exam_id)
        .await?
        .filter(|e| e.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Exam not found")))
}

/// Request an exam for a patient.
///
/// POST /clinics/{clinic_id}/exams
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id))]
pub async fn create_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateExamRequest>,
) -> Result<(StatusCode, Json<ExamResponse>), AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    state
        .db
        .find_patient_by_id(req.patient_id)
        .await?
        .filter(|p| p.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Patient not found")))?;

    if let Some(doctor_id) = req.doctor_id {
        state
            .db
            .find_doctor_by_id(doctor_id)
            .await?
            .filter(|d| d.clinic_id == clinic_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Doctor not found")))?;
    }

    let exam = Exam::new(clinic_id, req.patient_id, req.doctor_id, req.exam_type);
    state.db.insert_exam(&exam).await?;

    tracing::info!(exam_id = %exam.exam_id, "Exam requested");

    Ok((StatusCode::CREATED, Json(ExamResponse::from(exam))))
}

/// List a clinic's exams with optional patient and status filters.
///
/// GET /clinics/{clinic_id}/exams?patient_id=...&status=...
pub async fn list_exams(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<ListExamsQuery>,
) -> Result<Json<Vec<ExamResponse>>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let exams = state
        .db
        .find_exams_by_clinic(
            clinic_id,
            query.patient_id,
            query.status.map(|s| s.as_str()),
        )
        .await?;
    Ok(Json(exams.into_iter().map(ExamResponse::from).collect()))
}

/// Fetch one exam.
///
/// GET /clinics/{clinic_id}/exams/{exam_id}
pub async fn get_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, exam_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ExamResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let exam = load_exam(&state, clinic_id, exam_id).await?;
    Ok(Json(ExamResponse::from(exam)))
}

/// Update an exam. Status changes must follow the transition rules; a
/// completed exam gets its performed timestamp set once.
///
/// PATCH /clinics/{clinic_id}/exams/{exam_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, exam_id = %exam_id))]
pub async fn update_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, exam_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateExamRequest>,
) -> Result<Json<ExamResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let mut exam = load_exam(&state, clinic_id, exam_id).await?;

    if let Some(next) = req.status {
        let current_status = ExamStatus::from_str(&exam.exam_status_code)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        if !current_status.can_transition_to(next) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Cannot move exam from {} to {}",
                current_status.as_str(),
                next.as_str()
            )));
        }
        exam.exam_status_code = next.as_str().to_string();
        if next == ExamStatus::Completed {
            exam.performed_utc = Some(Utc::now());
        }
    }

    if let Some(doctor_id) = req.doctor_id {
        state
            .db
            .find_doctor_by_id(doctor_id)
            .await?
            .filter(|d| d.clinic_id == clinic_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Doctor not found")))?;
        exam.doctor_id = Some(doctor_id);
    }
    if let Some(exam_type) = req.exam_type {
        exam.exam_type = exam_type;
    }
    if let Some(result_summary) = req.result_summary {
        exam.result_summary = Some(result_summary);
    }

    state.db.update_exam(&exam).await?;

    Ok(Json(ExamResponse::from(exam)))
}

/// Delete an exam.
///
/// DELETE /clinics/{clinic_id}/exams/{exam_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, exam_id = %exam_id))]
pub async fn delete_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, exam_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    load_exam(&state, clinic_id, exam_id).await?;
    state.db.delete_exam(exam_id).await?;

    tracing::info!(exam_id = %exam_id, "Exam deleted");

    Ok(StatusCode::NO_CONTENT)
}
