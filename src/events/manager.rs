/// Event manager implementation using runtime queries
use crate::{
    auth::AuthUser,
    error::{PortalError, PortalResult},
    events::{CreateEventRequest, Event, EventScope, UpdateEventRequest},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{Row, SqlitePool};

const SELECT_EVENT: &str = r#"
    SELECT id, event_name, event_description, start_date, start_time,
           end_date, end_time, venue, category, cost, image, organizer_name,
           action_button_label, action_button_link, is_approved, organizer_id,
           created_at
    FROM events
"#;

/// Event manager service
pub struct EventManager {
    db: SqlitePool,
}

impl EventManager {
    /// Create a new event manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new event owned by the submitting user
    ///
    /// New events always start unapproved; the organizer is taken from the
    /// authenticated caller and cannot be supplied by the client.
    pub async fn create(&self, req: CreateEventRequest, organizer_id: i64) -> PortalResult<Event> {
        validate_submission(&req)?;

        let cost = req.cost.unwrap_or_else(|| "Free".to_string());
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO events
            (event_name, event_description, start_date, start_time, end_date,
             end_time, venue, category, cost, image, organizer_name,
             action_button_label, action_button_link, is_approved, organizer_id,
             created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&req.event_name)
        .bind(&req.event_description)
        .bind(req.start_date.to_string())
        .bind(req.start_time.to_string())
        .bind(req.end_date.map(|d| d.to_string()))
        .bind(req.end_time.map(|t| t.to_string()))
        .bind(&req.venue)
        .bind(&req.category)
        .bind(&cost)
        .bind(&req.image)
        .bind(&req.organizer_name)
        .bind(&req.action_button_label)
        .bind(&req.action_button_link)
        .bind(organizer_id)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(
            "Event {} submitted by user {} (id {})",
            req.event_name,
            organizer_id,
            id
        );

        Ok(Event {
            id,
            event_name: req.event_name,
            event_description: req.event_description,
            start_date: req.start_date,
            start_time: req.start_time,
            end_date: req.end_date,
            end_time: req.end_time,
            venue: req.venue,
            category: req.category,
            cost,
            image: req.image,
            organizer_name: req.organizer_name,
            action_button_label: req.action_button_label,
            action_button_link: req.action_button_link,
            is_approved: false,
            organizer: organizer_id,
            created_at: now,
        })
    }

    /// List events visible under the given scope, newest first
    pub async fn list(&self, scope: EventScope) -> PortalResult<Vec<Event>> {
        let rows = match scope {
            EventScope::Anonymous => {
                sqlx::query(&format!(
                    "{} WHERE is_approved = 1 ORDER BY created_at DESC, id DESC",
                    SELECT_EVENT
                ))
                .fetch_all(&self.db)
                .await?
            }
            EventScope::Member(user_id) => {
                sqlx::query(&format!(
                    "{} WHERE is_approved = 1 OR organizer_id = ? ORDER BY created_at DESC, id DESC",
                    SELECT_EVENT
                ))
                .bind(user_id)
                .fetch_all(&self.db)
                .await?
            }
            EventScope::Staff => {
                sqlx::query(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_EVENT))
                    .fetch_all(&self.db)
                    .await?
            }
        };

        rows.iter().map(parse_event).collect()
    }

    /// Get an event by id
    pub async fn get(&self, id: i64) -> PortalResult<Event> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_EVENT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Event {} not found", id)))?;

        parse_event(&row)
    }

    /// Admin edit of an event record
    pub async fn update(&self, id: i64, req: UpdateEventRequest) -> PortalResult<Event> {
        let mut event = self.get(id).await?;

        if let Some(v) = req.event_name {
            event.event_name = v;
        }
        if let Some(v) = req.event_description {
            event.event_description = v;
        }
        if let Some(v) = req.start_date {
            event.start_date = v;
        }
        if let Some(v) = req.start_time {
            event.start_time = v;
        }
        if let Some(v) = req.end_date {
            event.end_date = Some(v);
        }
        if let Some(v) = req.end_time {
            event.end_time = Some(v);
        }
        if let Some(v) = req.venue {
            event.venue = v;
        }
        if let Some(v) = req.category {
            event.category = v;
        }
        if let Some(v) = req.cost {
            event.cost = v;
        }
        if let Some(v) = req.image {
            event.image = Some(v);
        }
        if let Some(v) = req.organizer_name {
            event.organizer_name = Some(v);
        }
        if let Some(v) = req.action_button_label {
            event.action_button_label = Some(v);
        }
        if let Some(v) = req.action_button_link {
            event.action_button_link = Some(v);
        }
        if let Some(v) = req.is_approved {
            event.is_approved = v;
        }

        if let Some(end) = event.end_date {
            if end < event.start_date {
                return Err(PortalError::Validation(
                    "End date cannot be before start date".to_string(),
                ));
            }
        }

        sqlx::query(
            r#"
            UPDATE events
            SET event_name = ?, event_description = ?, start_date = ?,
                start_time = ?, end_date = ?, end_time = ?, venue = ?,
                category = ?, cost = ?, image = ?, organizer_name = ?,
                action_button_label = ?, action_button_link = ?, is_approved = ?
            WHERE id = ?
            "#,
        )
        .bind(&event.event_name)
        .bind(&event.event_description)
        .bind(event.start_date.to_string())
        .bind(event.start_time.to_string())
        .bind(event.end_date.map(|d| d.to_string()))
        .bind(event.end_time.map(|t| t.to_string()))
        .bind(&event.venue)
        .bind(&event.category)
        .bind(&event.cost)
        .bind(&event.image)
        .bind(&event.organizer_name)
        .bind(&event.action_button_label)
        .bind(&event.action_button_link)
        .bind(event.is_approved)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(event)
    }

    /// Delete an event; permitted to the owning organizer or any staff
    pub async fn delete(&self, id: i64, caller: &AuthUser) -> PortalResult<()> {
        let event = self.get(id).await?;

        if !caller.is_staff() && !caller.is_self(event.organizer) {
            return Err(PortalError::Authorization(
                "Only the organizer or staff can delete this event".to_string(),
            ));
        }

        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!("Event {} deleted by user {}", id, caller.username);
        Ok(())
    }
}

fn validate_submission(req: &CreateEventRequest) -> PortalResult<()> {
    if req.event_name.trim().is_empty() {
        return Err(PortalError::Validation(
            "Event name is required".to_string(),
        ));
    }
    if req.venue.trim().is_empty() {
        return Err(PortalError::Validation("Venue is required".to_string()));
    }
    if let Some(end) = req.end_date {
        if end < req.start_date {
            return Err(PortalError::Validation(
                "End date cannot be before start date".to_string(),
            ));
        }
    }
    Ok(())
}

/// Parse a database row into an Event
fn parse_event(row: &sqlx::sqlite::SqliteRow) -> PortalResult<Event> {
    let start_date_str: String = row.get("start_date");
    let start_time_str: String = row.get("start_time");
    let created_at_str: String = row.get("created_at");

    let start_date = NaiveDate::parse_from_str(&start_date_str, "%Y-%m-%d")
        .map_err(|e| PortalError::Internal(format!("Invalid date: {}", e)))?;
    let start_time = NaiveTime::parse_from_str(&start_time_str, "%H:%M:%S")
        .map_err(|e| PortalError::Internal(format!("Invalid time: {}", e)))?;
    let end_date = row
        .try_get::<String, _>("end_date")
        .ok()
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
    let end_time = row
        .try_get::<String, _>("end_time")
        .ok()
        .and_then(|s| NaiveTime::parse_from_str(&s, "%H:%M:%S").ok());
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| PortalError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Event {
        id: row.get("id"),
        event_name: row.get("event_name"),
        event_description: row.get("event_description"),
        start_date,
        start_time,
        end_date,
        end_time,
        venue: row.get("venue"),
        category: row.get("category"),
        cost: row.get("cost"),
        image: row.get("image"),
        organizer_name: row.get("organizer_name"),
        action_button_label: row.get("action_button_label"),
        action_button_link: row.get("action_button_link"),
        is_approved: row.get("is_approved"),
        organizer: row.get("organizer_id"),
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
        )
        .execute(&db)
        .await
        .unwrap();
        db
    }

    pub(crate) fn sample_event(name: &str) -> CreateEventRequest {
        CreateEventRequest {
            event_name: name.to_string(),
            event_description: "Annual alumni gathering".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_date: None,
            end_time: None,
            venue: "University Gymnasium".to_string(),
            category: "Reunion".to_string(),
            cost: None,
            image: None,
            organizer_name: None,
            action_button_label: None,
            action_button_link: None,
        }
    }

    fn member(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{}", id),
            is_staff: false,
            is_superuser: false,
        }
    }

    fn staff() -> AuthUser {
        AuthUser {
            id: 99,
            username: "admin".to_string(),
            is_staff: true,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_unapproved_with_forced_organizer() {
        let manager = EventManager::new(test_db().await);

        let event = manager.create(sample_event("Homecoming"), 7).await.unwrap();
        assert!(!event.is_approved);
        assert_eq!(event.organizer, 7);
        assert_eq!(event.cost, "Free");
    }

    #[tokio::test]
    async fn test_end_before_start_rejected() {
        let manager = EventManager::new(test_db().await);

        let mut req = sample_event("Homecoming");
        req.end_date = Some(NaiveDate::from_ymd_opt(2026, 3, 13).unwrap());
        let err = manager.create(req, 7).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[tokio::test]
    async fn test_visibility_scoping() {
        let manager = EventManager::new(test_db().await);

        // One approved event from user 1, one pending draft from user 2
        let approved = manager.create(sample_event("Public"), 1).await.unwrap();
        manager
            .update(
                approved.id,
                UpdateEventRequest {
                    is_approved: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let draft = manager.create(sample_event("Draft"), 2).await.unwrap();

        // Anonymous: approved only
        let visible = manager.list(EventScope::Anonymous).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].event_name, "Public");

        // Another member never sees the pending draft
        let visible = manager.list(EventScope::Member(3)).await.unwrap();
        assert_eq!(visible.len(), 1);

        // The owner sees their own draft
        let visible = manager.list(EventScope::Member(2)).await.unwrap();
        assert_eq!(visible.len(), 2);

        // Staff see everything
        let visible = manager.list(EventScope::Staff).await.unwrap();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().any(|e| e.id == draft.id));

        // Anonymous results are a strict subset of staff results
        let staff_ids: Vec<i64> = manager
            .list(EventScope::Staff)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        for event in manager.list(EventScope::Anonymous).await.unwrap() {
            assert!(staff_ids.contains(&event.id));
        }
    }

    #[tokio::test]
    async fn test_delete_owner_or_staff_only() {
        let manager = EventManager::new(test_db().await);
        let event = manager.create(sample_event("Homecoming"), 1).await.unwrap();

        // A different member cannot delete it
        let err = manager.delete(event.id, &member(2)).await.unwrap_err();
        assert!(matches!(err, PortalError::Authorization(_)));

        // The owner can
        manager.delete(event.id, &member(1)).await.unwrap();
        assert!(matches!(
            manager.get(event.id).await.unwrap_err(),
            PortalError::NotFound(_)
        ));

        // Staff can delete anyone's event
        let event = manager.create(sample_event("Another"), 1).await.unwrap();
        manager.delete(event.id, &staff()).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_round_trips_dates() {
        let manager = EventManager::new(test_db().await);
        let event = manager.create(sample_event("Homecoming"), 1).await.unwrap();

        let updated = manager
            .update(
                event.id,
                UpdateEventRequest {
                    end_date: Some(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()),
                    end_time: Some(NaiveTime::from_hms_opt(22, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.end_date.is_some());

        let fetched = manager.get(event.id).await.unwrap();
        assert_eq!(fetched.end_date, updated.end_date);
        assert_eq!(fetched.end_time, updated.end_time);
        assert_eq!(fetched.start_time, event.start_time);
    }
}
