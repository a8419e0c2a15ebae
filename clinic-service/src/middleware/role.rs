//! Role gate middleware, layered after the route guard.

use axum::{extract::{Request, State}, middleware::Next, response::Response};

use crate::middleware::CurrentUser;
use crate::models::AppRole;
use service_core::error::AppError;

/// Reject callers whose profile role differs from the required one.
/// Renders 403 access-denied; never redirects.
pub async fn require_role_middleware(
    State(required): State<AppRole>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Role gate ran before guard")))?;

    if current.profile.app_role != required.as_str() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Access denied: {} role required",
            required.as_str()
        )));
    }

    Ok(next.run(req).await)
}
