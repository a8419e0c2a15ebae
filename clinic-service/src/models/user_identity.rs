//! User identity model - credential records per authentication provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Identity provider codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentProvider {
    Password,
}

impl IdentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentProvider::Password => "password",
        }
    }
}

/// User identity entity. For password auth, ident_hash stores the Argon2 hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserIdentity {
    pub ident_id: Uuid,
    pub user_id: Uuid,
    pub ident_provider_code: String,
    pub ident_hash: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl UserIdentity {
    /// Create a new password identity.
    pub fn new_password(user_id: Uuid, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            ident_id: Uuid::new_v4(),
            user_id,
            ident_provider_code: IdentProvider::Password.as_str().to_string(),
            ident_hash: password_hash,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Check if this is a password identity.
    pub fn is_password(&self) -> bool {
        self.ident_provider_code == IdentProvider::Password.as_str()
    }
}
