//! Password reset handlers.

use axum::{extract::State, Json};

use crate::models::{PasswordResetConfirm, PasswordResetRequest, VerificationToken};
use crate::utils::{generate_opaque_token, hash_password, hash_token, Password, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

/// Start a password reset. Answers 200 whether or not the address is
/// registered, so the endpoint cannot be used to probe for accounts.
///
/// POST /auth/password-reset
#[tracing::instrument(skip_all)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(user) = state.db.find_user_by_email(&req.email).await? {
        let token = generate_opaque_token();
        let reset = VerificationToken::new_password_reset(user.user_id, hash_token(&token));
        state.db.insert_verification_token(&reset).await?;

        if let Err(e) = state
            .email
            .send_password_reset_email(&user.email, &token, &state.config.frontend.base_url)
            .await
        {
            tracing::warn!(user_id = %user.user_id, error = %e, "Reset email delivery failed");
        }
    }

    Ok(Json(serde_json::json!({
        "message": "If the address is registered, a password reset email has been sent"
    })))
}

/// Complete a password reset with the emailed token.
///
/// POST /auth/password-reset/confirm
#[tracing::instrument(skip_all)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetConfirm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = state
        .db
        .find_verification_token(&hash_token(&req.token), "password_reset")
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Reset token not found")))?;

    if token.is_expired() {
        return Err(AppError::Gone(anyhow::anyhow!("Reset token has expired")));
    }

    if !state.db.consume_verification_token(token.token_id).await? {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Reset token has already been used"
        )));
    }

    let password = Password::new(req.new_password);
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Hashing task failed: {}", e)))?
        .map_err(AppError::InternalError)?;

    state
        .db
        .update_user_identity_hash(token.user_id, "password", password_hash.as_str())
        .await?;

    // A reset invalidates every live session for the account.
    state.db.revoke_all_user_sessions(token.user_id).await?;

    tracing::info!(user_id = %token.user_id, "Password reset completed");

    Ok(Json(serde_json::json!({
        "message": "Password has been reset"
    })))
}
