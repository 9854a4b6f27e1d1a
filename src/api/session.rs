/// Login, token refresh, and current-identity endpoints
use crate::{
    account::{
        AccessTokenResponse, CurrentUserResponse, LoginRequest, RefreshRequest, TokenPairResponse,
    },
    auth::{self, AuthUser},
    context::AppContext,
    error::{PortalError, PortalResult},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/token/", post(login))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/user/me/", get(current_user))
}

/// Credential login; the issued access token embeds the role claims
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> PortalResult<Json<TokenPairResponse>> {
    let user = ctx
        .user_manager
        .verify_login(&req.username, &req.password)
        .await?;

    let access = auth::issue_access_token(&user, &ctx.config.authentication)?;
    let refresh = auth::issue_refresh_token(&user, &ctx.config.authentication)?;

    tracing::info!("User {} logged in", user.username);
    Ok(Json(TokenPairResponse { access, refresh }))
}

/// Exchange a refresh token for a new access token
async fn refresh(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> PortalResult<Json<AccessTokenResponse>> {
    let claims = auth::verify_token(&req.refresh, &ctx.config.authentication.jwt_secret)?;
    if claims.token_type != "refresh" {
        return Err(PortalError::Authentication(
            "Not a refresh token".to_string(),
        ));
    }

    // Re-read the user so revoked roles or a rejection take effect here
    let user = ctx.user_manager.get_user(claims.sub).await.map_err(|_| {
        PortalError::Authentication("Account no longer exists".to_string())
    })?;
    if !user.review_status.is_active() {
        return Err(PortalError::Authentication(
            "Account is disabled".to_string(),
        ));
    }

    let access = auth::issue_access_token(&user, &ctx.config.authentication)?;
    Ok(Json(AccessTokenResponse { access }))
}

/// Minimal identity projection for the authenticated caller
async fn current_user(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> PortalResult<Json<CurrentUserResponse>> {
    let user = ctx.user_manager.get_user(auth.id).await?;

    Ok(Json(CurrentUserResponse {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
    }))
}
