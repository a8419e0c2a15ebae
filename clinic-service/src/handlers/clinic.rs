//! Clinic CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::{ensure_member_access, ensure_operator_access, load_clinic};
use crate::middleware::CurrentUser;
use crate::models::{Clinic, ClinicResponse, CreateClinicRequest, UpdateClinicRequest};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Create a clinic owned by the caller.
///
/// POST /clinics
#[tracing::instrument(skip_all, fields(user_id = %current.user_id()))]
pub async fn create_clinic(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateClinicRequest>,
) -> Result<(StatusCode, Json<ClinicResponse>), AppError> {
    let clinic = Clinic::new(current.user_id(), req.clinic_name, req.address, req.phone);
    state.db.insert_clinic(&clinic).await?;

    tracing::info!(clinic_id = %clinic.clinic_id, "Clinic created");

    Ok((StatusCode::CREATED, Json(ClinicResponse::from(clinic))))
}

/// List clinics the caller owns or is an accepted member of.
///
/// GET /clinics
pub async fn list_clinics(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ClinicResponse>>, AppError> {
    let clinics = state.db.find_clinics_for_user(current.user_id()).await?;
    Ok(Json(clinics.into_iter().map(ClinicResponse::from).collect()))
}

/// Fetch one clinic.
///
/// GET /clinics/{clinic_id}
pub async fn get_clinic(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<ClinicResponse>, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;
    ensure_member_access(&state, &current, &clinic).await?;
    Ok(Json(ClinicResponse::from(clinic)))
}

/// Update clinic fields.
///
/// PATCH /clinics/{clinic_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id))]
pub async fn update_clinic(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClinicRequest>,
) -> Result<Json<ClinicResponse>, AppError> {
    let mut clinic = load_clinic(&state, clinic_id).await?;
    ensure_operator_access(&state, &current, &clinic).await?;

    if let Some(clinic_name) = req.clinic_name {
        clinic.clinic_name = clinic_name;
    }
    if let Some(address) = req.address {
        clinic.address = Some(address);
    }
    if let Some(phone) = req.phone {
        clinic.phone = Some(phone);
    }

    state.db.update_clinic(&clinic).await?;

    Ok(Json(ClinicResponse::from(clinic)))
}

/// Archive a clinic. Owner only; records are retained but the clinic stops
/// accepting new invitations.
///
/// DELETE /clinics/{clinic_id}
#[tracing::instrument(skip_all, fields(clinic_id = %clinic_id))]
pub async fn archive_clinic(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(clinic_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let clinic = load_clinic(&state, clinic_id).await?;

    if clinic.owner_user_id != current.user_id() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only the clinic owner can archive it"
        )));
    }

    state.db.archive_clinic(clinic_id).await?;

    tracing::info!(clinic_id = %clinic_id, "Clinic archived");

    Ok(StatusCode::NO_CONTENT)
}
