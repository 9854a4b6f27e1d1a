/// User registration, admin user management, and password reset endpoints
use crate::{
    account::{
        RegisterRequest, ResetConfirmRequest, ResetRequest, UpdateUserRequest, UserResponse,
    },
    auth::AdminUser,
    context::AppContext,
    error::PortalResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users/", post(register).get(list_users))
        .route("/api/users/:id/", get(get_user).patch(update_user))
        .route("/api/users/:id/approve/", post(approve_user))
        .route("/api/users/:id/reject/", post(reject_user))
        .route("/api/password-reset/request/", post(request_reset))
        .route("/api/password-reset/confirm/", post(confirm_reset))
}

/// Self-registration endpoint; no authentication required
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> PortalResult<(StatusCode, Json<UserResponse>)> {
    let user = ctx.user_manager.register(req).await?;
    Ok((StatusCode::CREATED, Json(user.to_response())))
}

/// Admin list of non-superuser accounts, newest registration first
async fn list_users(
    State(ctx): State<AppContext>,
    AdminUser(_admin): AdminUser,
) -> PortalResult<Json<Vec<UserResponse>>> {
    let users = ctx.user_manager.list_users().await?;
    Ok(Json(users.iter().map(|u| u.to_response()).collect()))
}

/// Admin detail view
async fn get_user(
    State(ctx): State<AppContext>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> PortalResult<Json<UserResponse>> {
    let user = ctx.user_manager.get_user(id).await?;
    Ok(Json(user.to_response()))
}

/// Admin edit, including role flags and review status
async fn update_user(
    State(ctx): State<AppContext>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> PortalResult<Json<UserResponse>> {
    let user = ctx.user_manager.update_user(id, req).await?;
    Ok(Json(user.to_response()))
}

/// Approve a registration
async fn approve_user(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> PortalResult<Json<serde_json::Value>> {
    let username = ctx.moderation.approve_user(id, &admin).await?;
    Ok(Json(json!({
        "detail": format!("User {} approved.", username)
    })))
}

/// Reject a registration, disabling login
async fn reject_user(
    State(ctx): State<AppContext>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> PortalResult<Json<serde_json::Value>> {
    let username = ctx.moderation.reject_user(id, &admin).await?;
    Ok(Json(json!({
        "detail": format!("User {} rejected.", username)
    })))
}

/// Request a password reset code (public endpoint)
async fn request_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetRequest>,
) -> PortalResult<Json<serde_json::Value>> {
    let (code, email) = ctx.reset_manager.request_reset(&req.username).await?;

    ctx.mailer
        .send_reset_code(&email, &req.username, &code)
        .await?;

    Ok(Json(json!({
        "detail": "OTP sent to your registered email."
    })))
}

/// Confirm a reset code and set the new password (public endpoint)
async fn confirm_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetConfirmRequest>,
) -> PortalResult<Json<serde_json::Value>> {
    ctx.reset_manager
        .confirm_reset(&req.username, &req.otp, &req.password)
        .await?;

    Ok(Json(json!({
        "detail": "Password has been reset."
    })))
}
