/// Dashboard activity feed endpoint
use crate::{
    admin::{activity::RECENT_LIMIT, ActivityEntry},
    auth::AuthUser,
    context::AppContext,
    error::PortalResult,
};
use axum::{extract::State, routing::get, Json, Router};

/// Build activity routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/activities/", get(recent_activities))
}

/// Last ten audit entries, newest first
async fn recent_activities(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
) -> PortalResult<Json<Vec<ActivityEntry>>> {
    let entries = ctx.activity_log.recent(RECENT_LIMIT).await?;
    Ok(Json(entries))
}
