/// Alumni association portal backend
///
/// REST API for alumni registration and event submission with an
/// admin-moderation workflow, activity logging, and OTP password reset.
mod account;
mod admin;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod events;
mod jobs;
mod mailer;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::PortalResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> PortalResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alumnet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}
