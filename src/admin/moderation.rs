/// Moderation state transitions for users and events
///
/// Every transition is one transaction covering the state write and the
/// audit insert, so a crash cannot leave an un-logged state change.
use crate::{
    account::ReviewStatus,
    auth::AuthUser,
    error::{PortalError, PortalResult},
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

pub const USER_MODULE: &str = "User Management";
pub const EVENT_MODULE: &str = "Event Management";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_REJECTED: &str = "Rejected";

/// Moderation service
pub struct ModerationService {
    db: SqlitePool,
}

impl ModerationService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Approve a user registration
    ///
    /// Superusers are not moderation targets; they surface as NotFound.
    pub async fn approve_user(&self, user_id: i64, actor: &AuthUser) -> PortalResult<String> {
        self.transition_user(user_id, ReviewStatus::Approved, actor)
            .await
    }

    /// Reject a user registration, disabling login
    pub async fn reject_user(&self, user_id: i64, actor: &AuthUser) -> PortalResult<String> {
        self.transition_user(user_id, ReviewStatus::Rejected, actor)
            .await
    }

    /// Approve an event for the public listing
    pub async fn approve_event(&self, event_id: i64, actor: &AuthUser) -> PortalResult<String> {
        self.transition_event(event_id, true, actor).await
    }

    /// Reject an event, removing it from the public listing
    pub async fn reject_event(&self, event_id: i64, actor: &AuthUser) -> PortalResult<String> {
        self.transition_event(event_id, false, actor).await
    }

    async fn transition_user(
        &self,
        user_id: i64,
        status: ReviewStatus,
        actor: &AuthUser,
    ) -> PortalResult<String> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query("SELECT username, is_superuser FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("User {} not found", user_id)))?;

        let username: String = row.get("username");
        let is_superuser: bool = row.get("is_superuser");
        if is_superuser {
            return Err(PortalError::NotFound(format!("User {} not found", user_id)));
        }

        sqlx::query("UPDATE users SET review_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let (verb, audit_status) = match status {
            ReviewStatus::Approved => ("approved", STATUS_COMPLETED),
            _ => ("rejected", STATUS_REJECTED),
        };
        record_audit(
            &mut tx,
            &format!("User {}: {}", verb, username),
            USER_MODULE,
            actor,
            audit_status,
        )
        .await?;

        tx.commit().await?;

        tracing::info!("User {} {} by {}", username, verb, actor.username);
        Ok(username)
    }

    async fn transition_event(
        &self,
        event_id: i64,
        approved: bool,
        actor: &AuthUser,
    ) -> PortalResult<String> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query("SELECT event_name FROM events WHERE id = ?")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Event {} not found", event_id)))?;

        let event_name: String = row.get("event_name");

        sqlx::query("UPDATE events SET is_approved = ? WHERE id = ?")
            .bind(approved)
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        let (verb, audit_status) = if approved {
            ("approved", STATUS_COMPLETED)
        } else {
            ("rejected", STATUS_REJECTED)
        };
        record_audit(
            &mut tx,
            &format!("Event {}: {}", verb, event_name),
            EVENT_MODULE,
            actor,
            audit_status,
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Event {} {} by {}", event_name, verb, actor.username);
        Ok(event_name)
    }
}

async fn record_audit(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    action: &str,
    module: &str,
    actor: &AuthUser,
    status: &str,
) -> PortalResult<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_log (action, module, actor_id, actor_username, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(action)
    .bind(module)
    .bind(actor.id)
    .bind(&actor.username)
    .bind(status)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::manager::tests::{sample_registration, test_db as users_db};
    use crate::account::manager::UserManager;
    use crate::admin::ActivityLogManager;
    use crate::events::manager::tests::sample_event;
    use crate::events::{EventManager, EventScope};

    async fn setup() -> (SqlitePool, ModerationService) {
        let db = users_db().await;
        for schema in [
            r#"
            CREATE TABLE events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name TEXT NOT NULL,
                event_description TEXT NOT NULL,
                start_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_date TEXT,
                end_time TEXT,
                venue TEXT NOT NULL,
                category TEXT NOT NULL,
                cost TEXT NOT NULL DEFAULT 'Free',
                image TEXT,
                organizer_name TEXT,
                action_button_label TEXT,
                action_button_link TEXT,
                is_approved INTEGER NOT NULL DEFAULT 0,
                organizer_id INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                module TEXT NOT NULL,
                actor_id INTEGER,
                actor_username TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        ] {
            sqlx::query(schema).execute(&db).await.unwrap();
        }

        let service = ModerationService::new(db.clone());
        (db, service)
    }

    fn admin() -> AuthUser {
        AuthUser {
            id: 99,
            username: "admin".to_string(),
            is_staff: true,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_approve_then_reject_user() {
        let (db, service) = setup().await;
        let users = UserManager::new(db.clone());
        let user = users
            .register(sample_registration("alice", "alice@example.com"))
            .await
            .unwrap();

        service.approve_user(user.id, &admin()).await.unwrap();
        let fetched = users.get_user(user.id).await.unwrap();
        assert_eq!(fetched.review_status, ReviewStatus::Approved);

        service.reject_user(user.id, &admin()).await.unwrap();
        let fetched = users.get_user(user.id).await.unwrap();
        assert_eq!(fetched.review_status, ReviewStatus::Rejected);
        // Legacy flags: rejected is (is_active=false, is_approved=false)
        assert!(!fetched.review_status.is_active());
        assert!(!fetched.review_status.is_approved());

        // Exactly two audit entries referencing the username
        let log = ActivityLogManager::new(db);
        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.action.contains("alice")));
        assert!(entries
            .iter()
            .any(|e| e.status == STATUS_COMPLETED && e.action.starts_with("User approved")));
        assert!(entries
            .iter()
            .any(|e| e.status == STATUS_REJECTED && e.action.starts_with("User rejected")));
    }

    #[tokio::test]
    async fn test_missing_target_writes_nothing() {
        let (db, service) = setup().await;

        let err = service.approve_user(12345, &admin()).await.unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));
        let err = service.approve_event(12345, &admin()).await.unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));

        // No audit entry for a failed transition
        let log = ActivityLogManager::new(db);
        assert!(log.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_superuser_is_not_a_moderation_target() {
        let (db, service) = setup().await;
        sqlx::query(
            r#"
            INSERT INTO users
            (username, email, password_hash, first_name, middle_name, last_name,
             is_married, phone_number, batch, program, review_status,
             is_staff, is_superuser, created_at)
            VALUES ('root', 'root@example.com', 'x', 'R', 'O', 'OT', 0, '0917',
                    '2020', 'CS', 'approved', 1, 1, '2024-01-01T00:00:00+00:00')
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        let err = service.reject_user(1, &admin()).await.unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));

        // State unchanged, nothing logged
        let row = sqlx::query("SELECT review_status FROM users WHERE id = 1")
            .fetch_one(&db)
            .await
            .unwrap();
        let status: String = row.get("review_status");
        assert_eq!(status, "approved");
        let log = ActivityLogManager::new(db);
        assert!(log.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_transitions_and_audit() {
        let (db, service) = setup().await;
        let events = EventManager::new(db.clone());
        let event = events.create(sample_event("Homecoming"), 7).await.unwrap();

        service.approve_event(event.id, &admin()).await.unwrap();
        assert!(events.get(event.id).await.unwrap().is_approved);
        // Now publicly visible
        assert_eq!(events.list(EventScope::Anonymous).await.unwrap().len(), 1);

        service.reject_event(event.id, &admin()).await.unwrap();
        assert!(!events.get(event.id).await.unwrap().is_approved);

        let log = ActivityLogManager::new(db);
        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.module == EVENT_MODULE));
        assert!(entries.iter().all(|e| e.action.contains("Homecoming")));
    }
}
