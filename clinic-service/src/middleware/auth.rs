//! Route guard middleware.
//!
//! Runs on every protected request: bearer token validation, blacklist
//! check, email-verification gate, lazy profile provisioning, and a
//! best-effort clinic-context load. Handlers receive the result as a
//! `CurrentUser` extension.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::models::{MembershipDetail, Profile, User};
use crate::AppState;
use service_core::error::AppError;

/// The authenticated caller, as derived by the route guard.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub profile: Profile,
    pub clinics: Vec<MembershipDetail>,
}

impl CurrentUser {
    /// Email of the authenticated identity.
    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }
}

/// Middleware to require authentication and derive the caller's context.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state
        .jwt
        .validate_access_token(token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token")))?;

    // Fail closed: if the blacklist store is unreachable, treat the token
    // as revoked rather than skipping the check.
    let is_blacklisted = state.redis.is_blacklisted(&claims.jti).await.map_err(|e| {
        tracing::error!(error = %e, "Blacklist check failed");
        AppError::InternalError(anyhow::anyhow!("Blacklist check failed"))
    })?;

    if is_blacklisted {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Token has been revoked"
        )));
    }

    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid token subject")))?;

    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))?;

    if !user.is_active() {
        return Err(AppError::Forbidden(anyhow::anyhow!("Account is suspended")));
    }

    if state.config.security.require_email_verification && !user.email_verified {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Email address is not verified"
        )));
    }

    // First authenticated pass provisions a default host profile. Concurrent
    // first requests both insert; ON CONFLICT lets exactly one row win.
    let profile = match state.db.find_profile(user_id).await? {
        Some(profile) => profile,
        None => {
            state.db.provision_profile(&Profile::new(user_id)).await?;
            tracing::info!(user_id = %user_id, "Provisioned default host profile");
            state.db.find_profile(user_id).await?.ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Profile missing after provisioning"))
            })?
        }
    };

    // Context is advisory; handlers re-check membership before touching
    // clinic data, so a failed lookup degrades to an empty context.
    let clinics = match state.db.find_memberships_for_user(user_id).await {
        Ok(clinics) => clinics,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Clinic context lookup failed");
            Vec::new()
        }
    };

    // Logout needs the jti to blacklist the access token.
    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(CurrentUser {
        user,
        profile,
        clinics,
    });

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "CurrentUser missing from request extensions"
            ))
        })
    }
}
