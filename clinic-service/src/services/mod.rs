pub mod database;
pub mod email;
pub mod jwt;
pub mod metrics;
pub mod redis;

pub use database::Database;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims};
pub use redis::{MockBlacklist, RedisService, TokenBlacklist};
