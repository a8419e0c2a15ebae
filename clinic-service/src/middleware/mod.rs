pub mod auth;
pub mod metrics;
pub mod role;

pub use auth::{auth_middleware, CurrentUser};
pub use metrics::metrics_middleware;
pub use role::require_role_middleware;
