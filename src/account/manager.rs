/// User manager implementation using runtime queries
///
/// Uses sqlx runtime query building instead of compile-time macros to avoid
/// needing DATABASE_URL during compilation.
use crate::{
    account::{
        RegisterRequest, ReviewStatus, UpdateUserRequest, User, BATCH_CHOICES, PROGRAM_CHOICES,
    },
    error::{FieldError, PortalError, PortalResult},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use validator::Validate;

/// User manager service
pub struct UserManager {
    db: SqlitePool,
}

impl UserManager {
    /// Create a new user manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a new user
    ///
    /// New registrations always start in Pending review state
    /// (legacy is_active=true, is_approved=false).
    pub async fn register(&self, req: RegisterRequest) -> PortalResult<User> {
        let mut req = req;
        validate_request(&req)?;

        // Maiden name only applies to married registrants
        if !req.is_married {
            req.maiden_name = None;
        }

        if self.username_exists(&req.username).await? {
            return Err(PortalError::Conflict(format!(
                "Username {} already taken",
                req.username
            )));
        }
        if self.email_exists(&req.email).await? {
            return Err(PortalError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&req.password)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users
            (username, email, password_hash, first_name, middle_name, last_name,
             is_married, maiden_name, phone_number, batch, program, valid_id,
             review_status, is_staff, is_superuser, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
            "#,
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.first_name)
        .bind(&req.middle_name)
        .bind(&req.last_name)
        .bind(req.is_married)
        .bind(&req.maiden_name)
        .bind(&req.phone_number)
        .bind(&req.batch)
        .bind(&req.program)
        .bind(&req.valid_id)
        .bind(ReviewStatus::Pending.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!("Registered user {} (id {})", req.username, id);

        Ok(User {
            id,
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            is_married: req.is_married,
            maiden_name: req.maiden_name,
            phone_number: req.phone_number,
            batch: req.batch,
            program: req.program,
            valid_id: req.valid_id,
            review_status: ReviewStatus::Pending,
            is_staff: false,
            is_superuser: false,
            created_at: now,
        })
    }

    /// Verify login credentials
    ///
    /// Rejected users cannot log in. The error message does not reveal
    /// which part of the credentials was wrong.
    pub async fn verify_login(&self, username: &str, password: &str) -> PortalResult<User> {
        let user = match self.find_by_username(username).await? {
            Some(user) => user,
            None => {
                return Err(PortalError::Authentication(
                    "Invalid username or password".to_string(),
                ))
            }
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(PortalError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        if !user.review_status.is_active() {
            return Err(PortalError::Authentication(
                "Account is disabled".to_string(),
            ));
        }

        Ok(user)
    }

    /// Get a user by id
    pub async fn get_user(&self, id: i64) -> PortalResult<User> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("User {} not found", id)))?;

        parse_user(&row)
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> PortalResult<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE username = ?", SELECT_USER))
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        row.map(|r| parse_user(&r)).transpose()
    }

    /// List all non-superuser accounts, newest registration first
    pub async fn list_users(&self) -> PortalResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_superuser = 0 ORDER BY created_at DESC, id DESC",
            SELECT_USER
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_user).collect()
    }

    /// Admin edit of a user record, including role flags and review status
    pub async fn update_user(&self, id: i64, req: UpdateUserRequest) -> PortalResult<User> {
        let mut user = self.get_user(id).await?;

        if let Some(v) = req.first_name {
            user.first_name = v;
        }
        if let Some(v) = req.middle_name {
            user.middle_name = v;
        }
        if let Some(v) = req.last_name {
            user.last_name = v;
        }
        if let Some(v) = req.is_married {
            user.is_married = v;
        }
        if let Some(v) = req.maiden_name {
            user.maiden_name = Some(v);
        }
        if let Some(v) = req.email {
            user.email = v;
        }
        if let Some(v) = req.phone_number {
            user.phone_number = v;
        }
        if let Some(v) = req.batch {
            validate_choice("batch", &v, BATCH_CHOICES)?;
            user.batch = v;
        }
        if let Some(v) = req.program {
            validate_choice("program", &v, PROGRAM_CHOICES)?;
            user.program = v;
        }
        if let Some(v) = req.review_status {
            user.review_status = v;
        }
        if let Some(v) = req.is_staff {
            user.is_staff = v;
        }
        if let Some(v) = req.is_superuser {
            user.is_superuser = v;
        }

        // Same rule as registration
        if !user.is_married {
            user.maiden_name = None;
        }

        sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?, middle_name = ?, last_name = ?, is_married = ?,
                maiden_name = ?, email = ?, phone_number = ?, batch = ?,
                program = ?, review_status = ?, is_staff = ?, is_superuser = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(user.is_married)
        .bind(&user.maiden_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.batch)
        .bind(&user.program)
        .bind(user.review_status.as_str())
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> PortalResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.db)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn email_exists(&self, email: &str) -> PortalResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, first_name, middle_name,
           last_name, is_married, maiden_name, phone_number, batch, program,
           valid_id, review_status, is_staff, is_superuser, created_at
    FROM users
"#;

/// Parse a database row into a User
pub(crate) fn parse_user(row: &sqlx::sqlite::SqliteRow) -> PortalResult<User> {
    let status_str: String = row.get("review_status");
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| PortalError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        middle_name: row.get("middle_name"),
        last_name: row.get("last_name"),
        is_married: row.get("is_married"),
        maiden_name: row.get("maiden_name"),
        phone_number: row.get("phone_number"),
        batch: row.get("batch"),
        program: row.get("program"),
        valid_id: row.get("valid_id"),
        review_status: ReviewStatus::from_str(&status_str)?,
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        created_at,
    })
}

/// Run derive-based validation plus the domain choice checks
fn validate_request(req: &RegisterRequest) -> PortalResult<()> {
    let mut errors: Vec<FieldError> = Vec::new();

    if let Err(e) = req.validate() {
        for (field, field_errors) in e.field_errors() {
            if let Some(first) = field_errors.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string());
                errors.push(FieldError::new(field.to_string(), message));
            }
        }
    }

    if !BATCH_CHOICES.contains(&req.batch.as_str()) {
        errors.push(FieldError::new("batch", "Select a valid batch."));
    }
    if !PROGRAM_CHOICES.contains(&req.program.as_str()) {
        errors.push(FieldError::new("program", "Select a valid program."));
    }
    if req.username.trim().is_empty() {
        errors.push(FieldError::new("username", "This field is required."));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortalError::FieldValidation(errors))
    }
}

fn validate_choice(field: &str, value: &str, choices: &[&str]) -> PortalResult<()> {
    if choices.contains(&value) {
        Ok(())
    } else {
        Err(PortalError::FieldValidation(vec![FieldError::new(
            field,
            format!("Select a valid {}.", field),
        )]))
    }
}

/// Hash a password with Argon2id
pub(crate) fn hash_password(password: &str) -> PortalResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
        Argon2,
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PortalError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored Argon2id hash
pub(crate) fn verify_password(password: &str, hash: &str) -> PortalResult<bool> {
    use argon2::{
        password_hash::{PasswordHash, PasswordVerifier},
        Argon2,
    };

    let parsed = PasswordHash::new(hash)
        .map_err(|e| PortalError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
