//! User registration model - lead capture from the public landing pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Registration interest entity.
#[derive(Debug, Clone, FromRow)]
pub struct UserRegistration {
    pub registration_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub clinic_name: Option<String>,
    pub message: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl UserRegistration {
    /// Create a new registration record.
    pub fn new(
        full_name: String,
        email: String,
        phone: Option<String>,
        clinic_name: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            registration_id: Uuid::new_v4(),
            full_name,
            email,
            phone,
            clinic_name,
            message,
            created_utc: Utc::now(),
        }
    }
}

/// Public request to register interest.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRegistrationRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub phone: Option<String>,
    pub clinic_name: Option<String>,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

/// Registration response for API.
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub registration_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub clinic_name: Option<String>,
    pub message: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<UserRegistration> for RegistrationResponse {
    fn from(r: UserRegistration) -> Self {
        Self {
            registration_id: r.registration_id,
            full_name: r.full_name,
            email: r.email,
            phone: r.phone,
            clinic_name: r.clinic_name,
            message: r.message,
            created_utc: r.created_utc,
        }
    }
}
