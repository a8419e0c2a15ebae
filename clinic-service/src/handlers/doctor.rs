//! Doctor handlers, scoped under a clinic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::{ensure_member_access, ensure_operator_access, load_clinic};
use crate::middleware::CurrentUser;
use crate::models::{CreateDoctorRequest, Doctor, DoctorResponse, UpdateDoctorRequest};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

async fn load_doctor(
    state: &AppState,
    clinic_id: Uuid,
    doctor_id: Uuid,
) -> Result<Doctor, AppError> {
    state
        .db
        .find_doctor_by_id(doctor_id)
        .await?
        .filter(|d| d.clinic_id == clinic_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Doctor not found")))
}

/// Create a doctor record.
///
/// POST /clinics/{clinic_id}/doctors
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id))]
pub async fn create_doctor(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<DoctorResponse>), AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    let doctor = Doctor::new(
        clinic_id,
        req.full_name,
        req.specialty,
        req.license_number,
        req.email,
        req.phone,
    );
    state.db.insert_doctor(&doctor).await?;

    tracing::info!(doctor_id = %doctor.doctor_id, "Doctor created");

    Ok((StatusCode::CREATED, Json(DoctorResponse::from(doctor))))
}

/// List a clinic's doctors.
///
/// GET /clinics/{clinic_id}/doctors
pub async fn list_doctors(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Vec<DoctorResponse>>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let doctors = state.db.find_doctors_by_clinic(clinic_id).await?;
    Ok(Json(doctors.into_iter().map(DoctorResponse::from).collect()))
}

/// Fetch one doctor.
///
/// GET /clinics/{clinic_id}/doctors/{doctor_id}
pub async fn get_doctor(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, doctor_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DoctorResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;

    let doctor = load_doctor(&state, clinic_id, doctor_id).await?;
    Ok(Json(DoctorResponse::from(doctor)))
}

/// Update a doctor. Setting revoke_system_access also deletes the doctor's
/// clinic_users rows, removing any login access tied to the record.
///
/// PATCH /clinics/{clinic_id}/doctors/{doctor_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, doctor_id = %doctor_id))]
pub async fn update_doctor(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, doctor_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateDoctorRequest>,
) -> Result<Json<DoctorResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    let mut doctor = load_doctor(&state, clinic_id, doctor_id).await?;

    if let Some(full_name) = req.full_name {
        doctor.full_name = full_name;
    }
    if let Some(specialty) = req.specialty {
        doctor.specialty = Some(specialty);
    }
    if let Some(license_number) = req.license_number {
        doctor.license_number = Some(license_number);
    }
    if let Some(email) = req.email {
        doctor.email = Some(email);
    }
    if let Some(phone) = req.phone {
        doctor.phone = Some(phone);
    }

    state.db.update_doctor(&doctor).await?;

    if req.revoke_system_access == Some(true) {
        let removed = state.db.delete_clinic_users_for_doctor(doctor_id).await?;
        tracing::info!(
            doctor_id = %doctor_id,
            removed,
            "System access revoked for doctor"
        );
    }

    Ok(Json(DoctorResponse::from(doctor)))
}

/// Deactivate a doctor. The record stays for history; exams and medical
/// records keep their references.
///
/// DELETE /clinics/{clinic_id}/doctors/{doctor_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id, doctor_id = %doctor_id))]
pub async fn deactivate_doctor(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((clinic_id, doctor_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    load_doctor(&state, clinic_id, doctor_id).await?;
    state.db.deactivate_doctor(doctor_id).await?;

    tracing::info!(doctor_id = %doctor_id, "Doctor deactivated");

    Ok(StatusCode::NO_CONTENT)
}
