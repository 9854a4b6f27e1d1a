/// Background maintenance jobs
use crate::context::AppContext;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_reset_cleanup_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Purge expired password reset codes (runs every 15 minutes)
    async fn expired_reset_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900));

        loop {
            interval.tick().await;

            match scheduler.context.reset_manager.purge_expired().await {
                Ok(count) => {
                    if count > 0 {
                        info!("Purged {} expired password reset codes", count);
                    }
                }
                Err(e) => error!("Failed to purge expired reset codes: {}", e),
            }
        }
    }
}
