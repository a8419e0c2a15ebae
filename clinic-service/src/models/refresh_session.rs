//! Refresh session model - token sessions for JWT refresh.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Refresh session entity.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub token_hash_text: String,
    pub expiry_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl RefreshSession {
    /// Create a new refresh session.
    pub fn new(user_id: Uuid, token_hash: String, expiry_days: i64) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            token_hash_text: token_hash,
            expiry_utc: Utc::now() + Duration::days(expiry_days),
            revoked_utc: None,
            created_utc: Utc::now(),
        }
    }

    /// Check if session is valid (not expired, not revoked).
    pub fn is_valid(&self) -> bool {
        self.revoked_utc.is_none() && self.expiry_utc > Utc::now()
    }

    /// Check if session is revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_utc.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_valid() {
        let session = RefreshSession::new(Uuid::new_v4(), "hash".to_string(), 7);
        assert!(session.is_valid());
        assert!(!session.is_revoked());
    }

    #[test]
    fn revoked_session_is_invalid() {
        let mut session = RefreshSession::new(Uuid::new_v4(), "hash".to_string(), 7);
        session.revoked_utc = Some(Utc::now());
        assert!(!session.is_valid());
        assert!(session.is_revoked());
    }

    #[test]
    fn expired_session_is_invalid() {
        let mut session = RefreshSession::new(Uuid::new_v4(), "hash".to_string(), 7);
        session.expiry_utc = Utc::now() - Duration::minutes(1);
        assert!(!session.is_valid());
    }
}
