//! Personal API key handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::models::{ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse, UserApiKey};
use crate::utils::{generate_opaque_token, hash_token, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

/// Create an API key for the caller. The plaintext key is returned exactly
/// once; only its hash is stored.
///
/// POST /me/api-keys
#[tracing::instrument(skip_all, fields(user_id = %current.user_id()))]
pub async fn create_api_key(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreateApiKeyResponse>), AppError> {
    let api_key = generate_opaque_token();
    let record = UserApiKey::new(current.user_id(), req.key_label, hash_token(&api_key));
    state.db.insert_api_key(&record).await?;

    tracing::info!(api_key_id = %record.api_key_id, "API key created");

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            api_key_id: record.api_key_id,
            key_label: record.key_label,
            api_key,
            created_utc: record.created_utc,
        }),
    ))
}

/// List the caller's API keys.
///
/// GET /me/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    let keys = state.db.find_api_keys_for_user(current.user_id()).await?;
    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

/// Revoke one of the caller's API keys.
///
/// DELETE /me/api-keys/{api_key_id}
#[tracing::instrument(skip_all, fields(user_id = %current.user_id(), api_key_id = %api_key_id))]
pub async fn revoke_api_key(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(api_key_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // Scoped to the caller; someone else's key id answers 404, not 403.
    if !state
        .db
        .revoke_api_key(api_key_id, current.user_id())
        .await?
    {
        return Err(AppError::NotFound(anyhow::anyhow!("API key not found")));
    }

    tracing::info!(api_key_id = %api_key_id, "API key revoked");

    Ok(StatusCode::NO_CONTENT)
}
