//! Public registration-interest handlers.

use axum::{extract::State, http::StatusCode, Json};

use crate::models::{RegistrationResponse, SubmitRegistrationRequest, UserRegistration};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Record interest from the public landing page. Unauthenticated; the route
/// sits behind bot detection and its own rate limiter.
///
/// POST /registrations
#[tracing::instrument(skip_all, fields(email = %req.email))]
pub async fn submit_registration(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SubmitRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let registration = UserRegistration::new(
        req.full_name,
        req.email,
        req.phone,
        req.clinic_name,
        req.message,
    );
    state.db.insert_registration(&registration).await?;

    tracing::info!(registration_id = %registration.registration_id, "Registration submitted");

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse::from(registration)),
    ))
}

/// List every registration. Platform admins only; the role gate runs in
/// front of this handler.
///
/// GET /admin/registrations
pub async fn list_registrations(
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    let registrations = state.db.find_all_registrations().await?;
    Ok(Json(
        registrations
            .into_iter()
            .map(RegistrationResponse::from)
            .collect(),
    ))
}
