//! User model - authentication identity plus profile base fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// User state codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Active,
    Suspended,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Active => "active",
            UserState::Suspended => "suspended",
        }
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub email_verified: bool,
    pub full_name: Option<String>,
    pub user_state_code: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    pub fn new(email: String, full_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            email,
            email_verified: false,
            full_name,
            user_state_code: UserState::Active.as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Check if user is active.
    pub fn is_active(&self) -> bool {
        self.user_state_code == UserState::Active.as_str()
    }
}

/// Request to register a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub full_name: Option<String>,
}

/// Request to login with email/password.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request to rotate the access token.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request to end the session.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Request to start a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request to complete a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetConfirm {
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Request to re-send the verification email.
#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request to update the caller's own account.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: Option<String>,
}

/// Request to change the caller's password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub email_verified: bool,
    pub full_name: Option<String>,
    pub user_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            email_verified: u.email_verified,
            full_name: u.full_name,
            user_state_code: u.user_state_code,
            created_utc: u.created_utc,
        }
    }
}

/// Token pair response after successful auth.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl TokenResponse {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Auth response with user info and tokens.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenResponse,
}
