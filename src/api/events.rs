/// Event listing, submission, and moderation endpoints
use crate::{
    auth::{AdminUser, AuthUser, OptionalAuthUser},
    context::AppContext,
    error::PortalResult,
    events::{CreateEventRequest, Event, EventScope, UpdateEventRequest},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/events/", get(list_events).post(create_event))
        .route("/api/events/:id/", get(get_event).patch(update_event))
        .route("/api/events/:id/approve/", post(approve_event))
        .route("/api/events/:id/reject/", post(reject_event))
        .route("/api/events/delete/:id/", delete(delete_event))
}

/// List events scoped to the caller's role:
/// anonymous callers see approved events, members additionally see their
/// own submissions, staff see everything
async fn list_events(
    State(ctx): State<AppContext>,
    OptionalAuthUser(auth): OptionalAuthUser,
) -> PortalResult<Json<Vec<Event>>> {
    let scope = EventScope::for_caller(auth.as_ref());
    let events = ctx.event_manager.list(scope).await?;
    Ok(Json(events))
}

/// Submit an event; the organizer is always the authenticated caller
async fn create_event(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> PortalResult<(StatusCode, Json<Event>)> {
    let event = ctx.event_manager.create(req, auth.id).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Admin detail view
async fn get_event(
    State(ctx): State<AppContext>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> PortalResult<Json<Event>> {
    let event = ctx.event_manager.get(id).await?;
    Ok(Json(event))
}

/// Admin edit, including the approval flag
async fn update_event(
    State(ctx): State<AppContext>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> PortalResult<Json<Event>> {
    let event = ctx.event_manager.update(id, req).await?;
    Ok(Json(event))
}

/// Approve an event for the public listing
async fn approve_event(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> PortalResult<Json<serde_json::Value>> {
    let name = ctx.moderation.approve_event(id, &admin).await?;
    Ok(Json(json!({
        "detail": format!("Event {} approved.", name)
    })))
}

/// Reject an event, removing it from the public listing
async fn reject_event(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> PortalResult<Json<serde_json::Value>> {
    let name = ctx.moderation.reject_event(id, &admin).await?;
    Ok(Json(json!({
        "detail": format!("Event {} rejected.", name)
    })))
}

/// Delete an event; permitted to the owning organizer or any staff
async fn delete_event(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> PortalResult<StatusCode> {
    ctx.event_manager.delete(id, &auth).await?;
    Ok(StatusCode::NO_CONTENT)
}
