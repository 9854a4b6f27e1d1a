/// Append-only activity log
///
/// Entries are created as a side effect of moderation actions and are never
/// mutated or deleted. The dashboard reads a capped recent-history slice.
use crate::error::{PortalError, PortalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// How many entries the dashboard shows
pub const RECENT_LIMIT: i64 = 10;

/// A single audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub action: String,
    pub module: String,
    pub actor_id: Option<i64>,
    pub actor_username: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Activity log manager
pub struct ActivityLogManager {
    db: SqlitePool,
}

impl ActivityLogManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append an entry
    pub async fn record(
        &self,
        action: &str,
        module: &str,
        actor_id: Option<i64>,
        actor_username: &str,
        status: &str,
    ) -> PortalResult<ActivityEntry> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO activity_log (action, module, actor_id, actor_username, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action)
        .bind(module)
        .bind(actor_id)
        .bind(actor_username)
        .bind(status)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(ActivityEntry {
            id: result.last_insert_rowid(),
            action: action.to_string(),
            module: module.to_string(),
            actor_id,
            actor_username: actor_username.to_string(),
            status: status.to_string(),
            created_at: now,
        })
    }

    /// Most recent entries, newest first
    pub async fn recent(&self, limit: i64) -> PortalResult<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, action, module, actor_id, actor_username, status, created_at
            FROM activity_log
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(parse_entry).collect()
    }
}

/// Parse a database row into an ActivityEntry
pub(crate) fn parse_entry(row: &sqlx::sqlite::SqliteRow) -> PortalResult<ActivityEntry> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| PortalError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(ActivityEntry {
        id: row.get("id"),
        action: row.get("action"),
        module: row.get("module"),
        actor_id: row.get("actor_id"),
        actor_username: row.get("actor_username"),
        status: row.get("status"),
        created_at,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn test_db() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(
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
        )
        .execute(&db)
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let manager = ActivityLogManager::new(test_db().await);

        let entry = manager
            .record(
                "User approved: alice",
                "User Management",
                Some(1),
                "admin",
                "Completed",
            )
            .await
            .unwrap();
        assert_eq!(entry.module, "User Management");

        let recent = manager.recent(RECENT_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, "User approved: alice");
    }

    #[tokio::test]
    async fn test_recent_caps_and_orders_newest_first() {
        let manager = ActivityLogManager::new(test_db().await);

        for i in 0..15 {
            manager
                .record(
                    &format!("Event approved: e{}", i),
                    "Event Management",
                    Some(1),
                    "admin",
                    "Completed",
                )
                .await
                .unwrap();
        }

        let recent = manager.recent(RECENT_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 10);
        // Newest first: the last insert leads
        assert_eq!(recent[0].action, "Event approved: e14");
        assert_eq!(recent[9].action, "Event approved: e5");
    }
}
