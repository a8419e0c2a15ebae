//! Registration and email verification handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::models::{
    RegisterRequest, ResendVerificationRequest, User, UserIdentity, UserResponse,
    VerificationToken,
};
use crate::utils::{generate_opaque_token, hash_password, hash_token, Password, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

/// Register a new account with email and password.
///
/// POST /auth/register
#[tracing::instrument(skip_all, fields(email = %req.email))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    // Argon2 hashing is CPU-bound; keep it off the async workers.
    let password = Password::new(req.password);
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Hashing task failed: {}", e)))?
        .map_err(AppError::InternalError)?;

    let user = User::new(req.email.clone(), req.full_name);
    // The unique index on LOWER(email) maps duplicates to 409 here.
    state.db.insert_user(&user).await?;

    let identity = UserIdentity::new_password(user.user_id, password_hash.into_string());
    state.db.insert_user_identity(&identity).await?;

    let token = generate_opaque_token();
    let verification = VerificationToken::new_email_verification(user.user_id, hash_token(&token));
    state.db.insert_verification_token(&verification).await?;

    if let Err(e) = state
        .email
        .send_verification_email(&user.email, &token, &state.config.frontend.base_url)
        .await
    {
        tracing::warn!(user_id = %user.user_id, error = %e, "Verification email delivery failed");
    }

    tracing::info!(user_id = %user.user_id, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Verify an email address with the emailed token.
///
/// GET /auth/verify?token=...
#[tracing::instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = state
        .db
        .find_verification_token(&hash_token(&query.token), "email_verification")
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Verification token not found")))?;

    if token.is_expired() {
        return Err(AppError::Gone(anyhow::anyhow!(
            "Verification token has expired"
        )));
    }

    // Guarded consume: a replayed link loses here.
    if !state.db.consume_verification_token(token.token_id).await? {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Verification token has already been used"
        )));
    }

    state
        .db
        .update_user_email_verified(token.user_id, true)
        .await?;

    tracing::info!(user_id = %token.user_id, "Email verified");

    Ok(Json(serde_json::json!({
        "message": "Email verified successfully"
    })))
}

/// Re-send the verification email. Answers 200 whether or not the address
/// is registered, so the endpoint cannot be used to probe for accounts.
///
/// POST /auth/resend-verification
#[tracing::instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendVerificationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(user) = state.db.find_user_by_email(&req.email).await? {
        if !user.email_verified {
            let token = generate_opaque_token();
            let verification =
                VerificationToken::new_email_verification(user.user_id, hash_token(&token));
            state.db.insert_verification_token(&verification).await?;

            if let Err(e) = state
                .email
                .send_verification_email(&user.email, &token, &state.config.frontend.base_url)
                .await
            {
                tracing::warn!(user_id = %user.user_id, error = %e, "Verification email delivery failed");
            }
        }
    }

    Ok(Json(serde_json::json!({
        "message": "If the address is registered, a verification email has been sent"
    })))
}
