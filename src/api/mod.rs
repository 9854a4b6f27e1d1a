/// API routes and handlers
pub mod activity;
pub mod events;
pub mod session;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(session::routes())
        .merge(users::routes())
        .merge(events::routes())
        .merge(activity::routes())
}
