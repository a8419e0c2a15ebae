//! Patient handlers, scoped under a clinic.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::{ensure_member_access, load_clinic};
use crate::middleware::CurrentUser;
use crate::models::{
    CreatePatientRequest, ListPatientsQuery, Patient, PatientResponse, UpdatePatientRequest,
};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

async fn load_patient(
    state: &AppState,
    clinic_id: Uuid,
    patient_id: Uuid,
) -> Result<Patient, AppError> {
    state
        .db
        .find_patient_by_id(patient_id)
        .await?
        .filter(|p| p.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Patient not found")))
}

/// Register a patient.
///
/// POST /clinics/{clinic_id}/patients
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id))]
pub async fn create_patient(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientResponse>), AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let patient = Patient::new(
        clinic_id,
        req.full_name,
        req.email,
        req.phone,
        req.birth_date,
        req.notes,
    );
    state.db.insert_patient(&patient).await?;

    tracing::info!(patient_id = %patient.patient_id, "Patient created");

    Ok((StatusCode::CREATED, Json(PatientResponse::from(patient))))
}

/// List a clinic's patients, optionally filtered by a name search.
///
/// GET /clinics/{clinic_id}/patients?search=...
pub async fn list_patients(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<ListPatientsQuery>,
) -> Result<Json<Vec<PatientResponse>>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let patients = state
        .db
        .find_patients_by_clinic(clinic_id, query.search.as_deref())
        .await?;
    Ok(Json(
        patients.into_iter().map(PatientResponse::from).collect(),
    ))
}

/// Fetch one patient.
///
/// GET /clinics/{clinic_id}/patients/{patient_id}
pub async fn get_patient(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, patient_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PatientResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let patient = load_patient(&state, clinic_id, patient_id).await?;
    Ok(Json(PatientResponse::from(patient)))
}

/// Update patient fields.
///
/// PATCH /clinics/{clinic_id}/patients/{patient_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, patient_id = %patient_id))]
pub async fn update_patient(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, patient_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdatePatientRequest>,
) -> Result<Json<PatientResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let mut patient = load_patient(&state, clinic_id, patient_id).await?;

    if let Some(full_name) = req.full_name {
        patient.full_name = full_name;
    }
    if let Some(email) = req.email {
        patient.email = Some(email);
    }
    if let Some(phone) = req.phone {
        patient.phone = Some(phone);
    }
    if let Some(birth_date) = req.birth_date {
        patient.birth_date = Some(birth_date);
    }
    if let Some(notes) = req.notes {
        patient.notes = Some(notes);
    }

    state.db.update_patient(&patient).await?;

    Ok(Json(PatientResponse::from(patient)))
}

/// Delete a patient and their clinical records.
///
/// DELETE /clinics/{clinic_id}/patients/{patient_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, patient_id = %patient_id))]
pub async fn delete_patient(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, patient_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    load_patient(&state, clinic_id, patient_id).await?;
    state.db.delete_patient(patient_id).await?;

    tracing::info!(patient_id = %patient_id, "Patient deleted");

    Ok(StatusCode::NO_CONTENT)
}
