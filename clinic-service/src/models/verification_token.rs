//! Verification token model - single-use email verification and password reset.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Verification token type codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    EmailVerification,
    PasswordReset,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::EmailVerification => "email_verification",
            TokenType::PasswordReset => "password_reset",
        }
    }
}

/// Verification token entity. Only the SHA-256 hash of the opaque token is
/// stored; the plaintext travels in the email link.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub token_type_code: String,
    pub expiry_utc: DateTime<Utc>,
    pub consumed_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl VerificationToken {
    /// Create a new email verification token (24 hour expiry).
    pub fn new_email_verification(user_id: Uuid, token_hash: String) -> Self {
        let now = Utc::now();
        Self {
            token_id: Uuid::new_v4(),
            user_id,
            token_hash,
            token_type_code: TokenType::EmailVerification.as_str().to_string(),
            expiry_utc: now + Duration::hours(24),
            consumed_utc: None,
            created_utc: now,
        }
    }

    /// Create a new password reset token (1 hour expiry).
    pub fn new_password_reset(user_id: Uuid, token_hash: String) -> Self {
        let now = Utc::now();
        Self {
            token_id: Uuid::new_v4(),
            user_id,
            token_hash,
            token_type_code: TokenType::PasswordReset.as_str().to_string(),
            expiry_utc: now + Duration::hours(1),
            consumed_utc: None,
            created_utc: now,
        }
    }

    /// Check if the token can still be consumed.
    pub fn is_usable(&self) -> bool {
        self.consumed_utc.is_none() && Utc::now() <= self.expiry_utc
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_usable() {
        let token = VerificationToken::new_email_verification(Uuid::new_v4(), "h".to_string());
        assert!(token.is_usable());
        assert!(!token.is_expired());
        assert_eq!(token.token_type_code, "email_verification");
    }

    #[test]
    fn consumed_token_is_not_usable() {
        let mut token = VerificationToken::new_password_reset(Uuid::new_v4(), "h".to_string());
        token.consumed_utc = Some(Utc::now());
        assert!(!token.is_usable());
    }

    #[test]
    fn reset_token_expires_after_one_hour() {
        let token = VerificationToken::new_password_reset(Uuid::new_v4(), "h".to_string());
        let delta = token.expiry_utc - token.created_utc;
        assert_eq!(delta.num_hours(), 1);
    }
}
