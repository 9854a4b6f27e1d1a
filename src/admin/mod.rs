/// Admin moderation workflow and audit logging
pub mod activity;
pub mod moderation;

pub use activity::{ActivityEntry, ActivityLogManager};
pub use moderation::ModerationService;
