/// Alumni account management
///
/// Handles registration, credential verification, the admin-facing user
/// list, and the review-state lifecycle of a registration.
pub(crate) mod manager;
mod reset;

pub use manager::UserManager;
pub use reset::PasswordResetManager;

use crate::error::{PortalError, PortalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Review state of a registration.
///
/// Replaces the legacy (is_active, is_approved) boolean pair with one
/// explicit status. Mapping to the legacy flags:
///
/// | status   | is_active | is_approved |
/// |----------|-----------|-------------|
/// | pending  | true      | false       |
/// | approved | true      | true        |
/// | rejected | false     | false       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Registered, awaiting admin review
    Pending,
    /// Vetted by an admin
    Approved,
    /// Rejected by an admin; login disabled
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> PortalResult<Self> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(PortalError::Internal(format!(
                "Invalid review status: {}",
                s
            ))),
        }
    }

    /// Legacy is_active flag: login permitted
    pub fn is_active(&self) -> bool {
        !matches!(self, ReviewStatus::Rejected)
    }

    /// Legacy is_approved flag: vetted by an admin
    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewStatus::Approved)
    }
}

/// Graduation batches accepted at registration
pub const BATCH_CHOICES: &[&str] = &["2020", "2021", "2022", "2023", "2024", "2025"];

/// Program codes accepted at registration
pub const PROGRAM_CHOICES: &[&str] = &["CS", "IT", "IS", "CE"];

/// A stored user record
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub is_married: bool,
    pub maiden_name: Option<String>,
    pub phone_number: String,
    pub batch: String,
    pub program: String,
    pub valid_id: Option<String>,
    pub review_status: ReviewStatus,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            is_married: self.is_married,
            maiden_name: self.maiden_name.clone(),
            phone_number: self.phone_number.clone(),
            batch: self.batch.clone(),
            program: self.program.clone(),
            valid_id: self.valid_id.clone(),
            review_status: self.review_status,
            is_active: self.review_status.is_active(),
            is_approved: self.review_status.is_approved(),
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            created_at: self.created_at,
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(must_match(other = "email", message = "Email addresses do not match."))]
    pub confirm_email: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub middle_name: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub last_name: String,
    #[serde(default)]
    pub is_married: bool,
    pub maiden_name: Option<String>,
    #[validate(length(min = 1, message = "This field is required."))]
    pub phone_number: String,
    pub batch: String,
    pub program: String,
    pub valid_id: Option<String>,
}

/// User record as returned by the API (password hash excluded).
/// Carries both the review status and the legacy boolean pair.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub is_married: bool,
    pub maiden_name: Option<String>,
    pub phone_number: String,
    pub batch: String,
    pub program: String,
    pub valid_id: Option<String>,
    pub review_status: ReviewStatus,
    pub is_active: bool,
    pub is_approved: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// Minimal identity projection for GET /api/user/me/
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Admin edit of a user record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub is_married: Option<bool>,
    pub maiden_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub batch: Option<String>,
    pub program: Option<String>,
    pub review_status: Option<ReviewStatus>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Credential login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Access + refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Token refresh request
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refreshed access token
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Password reset request (step one)
#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequest {
    pub username: String,
}

/// Password reset confirmation (step two)
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfirmRequest {
    pub username: String,
    pub otp: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_flag_mapping() {
        assert!(ReviewStatus::Pending.is_active());
        assert!(!ReviewStatus::Pending.is_approved());
        assert!(ReviewStatus::Approved.is_active());
        assert!(ReviewStatus::Approved.is_approved());
        assert!(!ReviewStatus::Rejected.is_active());
        assert!(!ReviewStatus::Rejected.is_approved());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ReviewStatus::Pending,
            ReviewStatus::Approved,
            ReviewStatus::Rejected,
        ] {
            assert_eq!(ReviewStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(ReviewStatus::from_str("banned").is_err());
    }
}
