//! Account handlers for the authenticated caller.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::middleware::CurrentUser;
use crate::models::{
    ChangePasswordRequest, ProfileResponse, SessionContext, UpdateMeRequest, UserResponse,
};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: ProfileResponse,
}

/// Return the caller's account and profile.
///
/// GET /me
pub async fn get_me(current: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserResponse::from(current.user),
        profile: ProfileResponse::from(current.profile),
    })
}

/// Return the caller's session context. Derived fresh from the database on
/// every call; the client never supplies its own.
///
/// GET /me/context
pub async fn get_context(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<SessionContext>, AppError> {
    let owned = state.db.find_clinics_owned_by(current.user_id()).await?;
    Ok(Json(SessionContext::derive(
        &current.profile,
        &current.clinics,
        &owned,
    )))
}

/// Update the caller's account fields.
///
/// PATCH /me
#[tracing::instrument(skip_all, fields(user_id = %current.user_id()))]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if let Some(full_name) = &req.full_name {
        state
            .db
            .update_user_full_name(current.user_id(), full_name)
            .await?;
    }

    let user = state
        .db
        .find_user_by_id(current.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(UserResponse::from(user)))
}

/// Change the caller's password. Requires the current password and revokes
/// every refresh session on success.
///
/// POST /me/password
#[tracing::instrument(skip_all, fields(user_id = %current.user_id()))]
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let identity = state
        .db
        .find_user_identity(current.user_id(), "password")
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Account has no password identity"))
        })?;

    let current_password = Password::new(req.current_password);
    let stored_hash = PasswordHashString::new(identity.ident_hash);
    tokio::task::spawn_blocking(move || verify_password(&current_password, &stored_hash))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Verification task failed: {}", e)))?
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Current password is incorrect")))?;

    let new_password = Password::new(req.new_password);
    let new_hash = tokio::task::spawn_blocking(move || hash_password(&new_password))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Hashing task failed: {}", e)))?
        .map_err(AppError::InternalError)?;

    state
        .db
        .update_user_identity_hash(current.user_id(), "password", new_hash.as_str())
        .await?;
    state.db.revoke_all_user_sessions(current.user_id()).await?;

    tracing::info!(user_id = %current.user_id(), "Password changed");

    Ok(Json(serde_json::json!({
        "message": "Password changed; sign in again"
    })))
}
