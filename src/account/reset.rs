/// One-time-code password reset flow
///
/// One pending code per user, upserted on each request. Codes expire after
/// a configurable TTL and are invalidated after too many wrong attempts.
use crate::{
    account::manager::{hash_password, parse_user},
    config::PasswordResetConfig,
    error::{FieldError, PortalError, PortalResult},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::{Row, SqlitePool};

const INVALID_REQUEST: &str = "Invalid or expired reset request";

/// A pending reset issued for a user
#[derive(Debug, Clone)]
pub struct PendingReset {
    pub user_id: i64,
    pub code: String,
    pub attempts: u32,
    pub expires_at: DateTime<Utc>,
}

/// Password reset manager
pub struct PasswordResetManager {
    db: SqlitePool,
    config: PasswordResetConfig,
}

impl PasswordResetManager {
    pub fn new(db: SqlitePool, config: PasswordResetConfig) -> Self {
        Self { db, config }
    }

    /// Issue a reset code for the named user
    ///
    /// Overwrites any previous pending code and resets the attempt counter.
    /// Returns the code and the on-file email address for delivery.
    pub async fn request_reset(&self, username: &str) -> PortalResult<(String, String)> {
        let row = sqlx::query("SELECT id, email FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                PortalError::NotFound(format!("No account with username {}", username))
            })?;

        let user_id: i64 = row.get("id");
        let email: String = row.get("email");

        let code = generate_code();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.code_ttl as i64);

        sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, code, attempts, created_at, expires_at)
            VALUES (?, ?, 0, ?, ?)
            ON CONFLICT(user_id) DO UPDATE
            SET code = excluded.code,
                attempts = 0,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(user_id)
        .bind(&code)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        tracing::info!("Issued password reset code for user {}", username);
        Ok((code, email))
    }

    /// Confirm a reset code and set the new password
    ///
    /// A matching code consumes the reset row; a wrong code counts one
    /// attempt and leaves the code valid until the attempt cap is reached.
    pub async fn confirm_reset(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> PortalResult<()> {
        if new_password.len() < 8 {
            return Err(PortalError::FieldValidation(vec![FieldError::new(
                "password",
                "Password must be at least 8 characters long.",
            )]));
        }

        let user = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, first_name, middle_name,
                   last_name, is_married, maiden_name, phone_number, batch, program,
                   valid_id, review_status, is_staff, is_superuser, created_at
            FROM users WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .map(|r| parse_user(&r))
        .transpose()?
        .ok_or_else(|| PortalError::Validation(INVALID_REQUEST.to_string()))?;

        let pending = self
            .get_pending(user.id)
            .await?
            .ok_or_else(|| PortalError::Validation(INVALID_REQUEST.to_string()))?;

        if pending.expires_at < Utc::now() {
            self.delete_pending(user.id).await?;
            return Err(PortalError::Validation(INVALID_REQUEST.to_string()));
        }

        if pending.code != code {
            let attempts = pending.attempts + 1;
            if attempts >= self.config.max_attempts {
                self.delete_pending(user.id).await?;
                tracing::warn!(
                    "Reset code for user {} invalidated after {} wrong attempts",
                    username,
                    attempts
                );
                return Err(PortalError::Validation(
                    "Too many invalid attempts, request a new code".to_string(),
                ));
            }
            sqlx::query("UPDATE password_resets SET attempts = ? WHERE user_id = ?")
                .bind(attempts)
                .bind(user.id)
                .execute(&self.db)
                .await?;
            return Err(PortalError::Validation("Invalid OTP".to_string()));
        }

        // Password update and code consumption succeed or fail together
        let password_hash = hash_password(new_password)?;
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Password reset completed for user {}", username);
        Ok(())
    }

    /// Remove expired reset rows; returns how many were purged
    pub async fn purge_expired(&self) -> PortalResult<u64> {
        let result = sqlx::query("DELETE FROM password_resets WHERE expires_at < ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn get_pending(&self, user_id: i64) -> PortalResult<Option<PendingReset>> {
        let row = sqlx::query(
            "SELECT user_id, code, attempts, expires_at FROM password_resets WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(|row| {
            let expires_at_str: String = row.get("expires_at");
            let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
                .map_err(|e| PortalError::Internal(format!("Invalid timestamp: {}", e)))?
                .with_timezone(&Utc);
            let attempts: i64 = row.get("attempts");

            Ok(PendingReset {
                user_id: row.get("user_id"),
                code: row.get("code"),
                attempts: attempts as u32,
                expires_at,
            })
        })
        .transpose()
    }

    async fn delete_pending(&self, user_id: i64) -> PortalResult<()> {
        sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Generate a uniform 6-digit code, leading zeros preserved
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}
