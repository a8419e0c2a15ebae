pub mod bot_detection;
pub mod rate_limit;
pub mod security_headers;
pub mod tracing;

pub use bot_detection::bot_detection_middleware;
pub use rate_limit::{IpRateLimiter, create_ip_rate_limiter, ip_rate_limit_middleware};
pub use security_headers::security_headers_middleware;
pub use tracing::{REQUEST_ID_HEADER, request_id_middleware};
