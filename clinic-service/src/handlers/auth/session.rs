//! Login, token refresh, and logout handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;

use crate::middleware::CurrentUser;
use crate::models::{
    AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RefreshSession, TokenResponse,
    UserResponse,
};
use crate::services::AccessTokenClaims;
use crate::utils::{hash_token, verify_password, Password, PasswordHashString, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

fn invalid_credentials() -> AppError {
    // One message for every failure mode so responses do not reveal
    // whether the email is registered.
    AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"))
}

/// Login with email and password.
///
/// POST /auth/login
#[tracing::instrument(skip_all, fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let identity = state
        .db
        .find_user_identity(user.user_id, "password")
        .await?
        .ok_or_else(invalid_credentials)?;

    let password = Password::new(req.password);
    let stored_hash = PasswordHashString::new(identity.ident_hash);
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Verification task failed: {}", e)))?
        .map_err(|_| invalid_credentials())?;

    if !user.is_active() {
        return Err(AppError::Forbidden(anyhow::anyhow!("Account is suspended")));
    }

    let (access_token, refresh_token, refresh_token_id) = state
        .jwt
        .generate_token_pair(&user.user_id.to_string(), &user.email)
        .map_err(AppError::InternalError)?;

    // The session is keyed by the refresh token's jti hash, so the raw
    // refresh JWT never touches the database.
    let session = RefreshSession::new(
        user.user_id,
        hash_token(&refresh_token_id),
        state.jwt.refresh_token_expiry_days(),
    );
    state.db.insert_refresh_session(&session).await?;

    tracing::info!(user_id = %user.user_id, "User logged in");

    let tokens = TokenResponse::new(
        access_token,
        refresh_token,
        state.jwt.access_token_expiry_seconds(),
    );

    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        tokens,
    }))
}

/// Rotate the access token with a valid refresh token.
///
/// POST /auth/refresh
#[tracing::instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let claims = state
        .jwt
        .validate_refresh_token(&req.refresh_token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired refresh token")))?;

    let session = state
        .db
        .find_refresh_session_by_hash(&hash_token(&claims.jti))
        .await?
        .filter(RefreshSession::is_valid)
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Refresh session is revoked or expired"))
        })?;

    let user = state
        .db
        .find_user_by_id(session.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))?;

    if !user.is_active() {
        return Err(AppError::Forbidden(anyhow::anyhow!("Account is suspended")));
    }

    let access_token = state
        .jwt
        .generate_access_token(&user.user_id.to_string(), &user.email)
        .map_err(AppError::InternalError)?;

    Ok(Json(TokenResponse::new(
        access_token,
        req.refresh_token,
        state.jwt.access_token_expiry_seconds(),
    )))
}

/// End the session: revoke the refresh session and blacklist the access
/// token for its remaining lifetime.
///
/// POST /auth/logout
#[tracing::instrument(skip_all, fields(user_id = %current.user_id()))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    Extension(claims): Extension<AccessTokenClaims>,
    Json(req): Json<LogoutRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if let Ok(refresh_claims) = state.jwt.validate_refresh_token(&req.refresh_token) {
        let session = state
            .db
            .find_refresh_session_by_hash(&hash_token(&refresh_claims.jti))
            .await?;
        if let Some(session) = session.filter(|s| s.user_id == current.user_id()) {
            state.db.revoke_refresh_session(session.session_id).await?;
        }
    }

    let remaining = claims.exp - Utc::now().timestamp();
    if remaining > 0 {
        state
            .redis
            .blacklist_token(&claims.jti, remaining)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to blacklist access token");
                AppError::InternalError(anyhow::anyhow!("Failed to blacklist access token"))
            })?;
    }

    tracing::info!(user_id = %current.user_id(), "User logged out");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}
