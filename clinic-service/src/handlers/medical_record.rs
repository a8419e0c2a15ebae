//! Medical record handlers, scoped under a clinic.
//!
//! Every member can read records; writing them takes the owner, an admin,
//! or a doctor. Reception staff are read-only here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::{ensure_member_access, load_clinic, ClinicAccess};
use crate::middleware::CurrentUser;
use crate::models::{
    Clinic, CreateMedicalRecordRequest, ListMedicalRecordsQuery, MedicalRecord,
    MedicalRecordResponse, MemberRole, UpdateMedicalRecordRequest,
};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

async fn ensure_clinical_write_access(
    state: &AppState,
    current: &CurrentUser,
    clinic: &Clinic,
) -> Result<(), AppError> {
    match ensure_member_access(state, current, clinic).await? {
        ClinicAccess::Owner
        | ClinicAccess::Member(MemberRole::Admin)
        | ClinicAccess::Member(MemberRole::Doctor) => Ok(()),
        ClinicAccess::Member(MemberRole::Reception) => Err(AppError::Forbidden(anyhow::anyhow!(
            "Reception staff cannot modify medical records"
        ))),
    }
}

async fn load_record(
    state: &AppState,
    clinic_id: Uuid,
    record_id: Uuid,
) -> Result<MedicalRecord, AppError> {
    state
        .db
        .find_medical_record_by_id(record_id)
        .await?
        .filter(|r| r.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Medical record not found")))
}

/// Create a medical record for a visit.
///
/// POST /clinics/{clinic_id}/medical-records
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id))]
pub async fn create_medical_record(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateMedicalRecordRequest>,
) -> Result<(StatusCode, Json<MedicalRecordResponse>), AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_clinical_write_access(&state, &current, &clinic).await?;

    state
        .db
        .find_patient_by_id(req.patient_id)
        .await?
        .filter(|p| p.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Patient not found")))?;

    state
        .db
        .find_doctor_by_id(req.doctor_id)
        .await?
        .filter(|d| d.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Doctor not found")))?;

    let record = MedicalRecord::new(
        clinic_id,
        req.patient_id,
        req.doctor_id,
        req.record_date,
        req.chief_complaint,
        req.diagnosis,
        req.prescription,
        req.notes,
    );
    state.db.insert_medical_record(&record).await?;

    tracing::info!(record_id = %record.record_id, "Medical record created");

    Ok((
        StatusCode::CREATED,
        Json(MedicalRecordResponse::from(record)),
    ))
}

/// List a clinic's medical records, optionally for one patient.
///
/// GET /clinics/{clinic_id}/medical-records?patient_id=...
pub async fn list_medical_records(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<ListMedicalRecordsQuery>,
) -> Result<Json<Vec<MedicalRecordResponse>>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let records = state
        .db
        .find_medical_records_by_clinic(clinic_id, query.patient_id)
        .await?;
    Ok(Json(
        records
            .into_iter()
            .map(MedicalRecordResponse::from)
            .collect(),
    ))
}

/// Fetch one medical record.
///
/// GET /clinics/{clinic_id}/medical-records/{record_id}
pub async fn get_medical_record(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, record_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MedicalRecordResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let record = load_record(&state, clinic_id, record_id).await?;
    Ok(Json(MedicalRecordResponse::from(record)))
}

/// Update medical record fields.
///
/// PATCH /clinics/{clinic_id}/medical-records/{record_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, record_id = %record_id))]
pub async fn update_medical_record(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, record_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateMedicalRecordRequest>,
) -> Result<Json<MedicalRecordResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_clinical_write_access(&state, &current, &clinic).await?;

    let mut record = load_record(&state, clinic_id, record_id).await?;

    if let Some(record_date) = req.record_date {
        record.record_date = record_date;
    }
    if let Some(chief_complaint) = req.chief_complaint {
        record.chief_complaint = Some(chief_complaint);
    }
    if let Some(diagnosis) = req.diagnosis {
        record.diagnosis = Some(diagnosis);
    }
    if let Some(prescription) = req.prescription {
        record.prescription = Some(prescription);
    }
    if let Some(notes) = req.notes {
        record.notes = Some(notes);
    }

    state.db.update_medical_record(&record).await?;

    Ok(Json(MedicalRecordResponse::from(record)))
}

/// Delete a medical record.
///
/// DELETE /clinics/{clinic_id}/medical-records/{record_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, record_id = %record_id))]
pub async fn delete_medical_record(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, record_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_clinical_write_access(&state, &current, &clinic).await?;

    load_record(&state, clinic_id, record_id).await?;
    state.db.delete_medical_record(record_id).await?;

    tracing::info!(record_id = %record_id, "Medical record deleted");

    Ok(StatusCode::NO_CONTENT)
}
