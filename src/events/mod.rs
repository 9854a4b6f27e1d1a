/// Event submission and moderation
///
/// Members submit events; staff approve them before they appear in the
/// public listing.
pub(crate) mod manager;

pub use manager::EventManager;

use crate::auth::AuthUser;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored event record
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub event_name: String,
    pub event_description: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub venue: String,
    pub category: String,
    pub cost: String,
    pub image: Option<String>,
    pub organizer_name: Option<String>,
    pub action_button_label: Option<String>,
    pub action_button_link: Option<String>,
    pub is_approved: bool,
    /// Owning user id
    pub organizer: i64,
    pub created_at: DateTime<Utc>,
}

/// Event submission payload. Approval state and organizer are server-set.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub event_name: String,
    pub event_description: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub venue: String,
    pub category: String,
    pub cost: Option<String>,
    pub image: Option<String>,
    pub organizer_name: Option<String>,
    pub action_button_label: Option<String>,
    pub action_button_link: Option<String>,
}

/// Admin edit of an event, including the approval flag
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub event_name: Option<String>,
    pub event_description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub cost: Option<String>,
    pub image: Option<String>,
    pub organizer_name: Option<String>,
    pub action_button_label: Option<String>,
    pub action_button_link: Option<String>,
    pub is_approved: Option<bool>,
}

/// List visibility derived from the caller's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Approved events only
    Anonymous,
    /// Approved events plus the member's own submissions
    Member(i64),
    /// Every event, any approval state
    Staff,
}

impl EventScope {
    /// Derive the scope for an (optionally authenticated) caller
    pub fn for_caller(auth: Option<&AuthUser>) -> Self {
        match auth {
            Some(user) if user.is_staff() => EventScope::Staff,
            Some(user) => EventScope::Member(user.id),
            None => EventScope::Anonymous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: i64, staff: bool) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{}", id),
            is_staff: staff,
            is_superuser: false,
        }
    }

    #[test]
    fn test_scope_for_caller() {
        assert_eq!(EventScope::for_caller(None), EventScope::Anonymous);
        assert_eq!(
            EventScope::for_caller(Some(&caller(4, false))),
            EventScope::Member(4)
        );
        assert_eq!(
            EventScope::for_caller(Some(&caller(4, true))),
            EventScope::Staff
        );
    }
}
