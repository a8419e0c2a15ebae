//! User API key model - personal keys, stored hashed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// User API key entity.
#[derive(Debug, Clone, FromRow)]
pub struct UserApiKey {
    pub api_key_id: Uuid,
    pub user_id: Uuid,
    pub key_label: String,
    pub key_hash: String,
    pub created_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl UserApiKey {
    /// Create a new key record.
    pub fn new(user_id: Uuid, key_label: String, key_hash: String) -> Self {
        Self {
            api_key_id: Uuid::new_v4(),
            user_id,
            key_label,
            key_hash,
            created_utc: Utc::now(),
            revoked_utc: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_utc.is_some()
    }
}

/// Request to create an API key.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100, message = "Label must be 1-100 characters"))]
    pub key_label: String,
}

/// Response after creating an API key. The plaintext key appears here once.
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub api_key_id: Uuid,
    pub key_label: String,
    pub api_key: String,
    pub created_utc: DateTime<Utc>,
}

/// API key listing entry (hash never leaves the database).
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub api_key_id: Uuid,
    pub key_label: String,
    pub created_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl From<UserApiKey> for ApiKeyResponse {
    fn from(k: UserApiKey) -> Self {
        Self {
            api_key_id: k.api_key_id,
            key_label: k.key_label,
            created_utc: k.created_utc,
            revoked_utc: k.revoked_utc,
        }
    }
}
