/// Application context and dependency injection
use crate::{
    account::{PasswordResetManager, UserManager},
    admin::{ActivityLogManager, ModerationService},
    config::ServerConfig,
    db,
    error::PortalResult,
    events::EventManager,
    mailer::Mailer,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub user_manager: Arc<UserManager>,
    pub event_manager: Arc<EventManager>,
    pub moderation: Arc<ModerationService>,
    pub activity_log: Arc<ActivityLogManager>,
    pub reset_manager: Arc<PasswordResetManager>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> PortalResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directory if it doesn't exist
        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let user_manager = Arc::new(UserManager::new(pool.clone()));
        let event_manager = Arc::new(EventManager::new(pool.clone()));
        let moderation = Arc::new(ModerationService::new(pool.clone()));
        let activity_log = Arc::new(ActivityLogManager::new(pool.clone()));
        let reset_manager = Arc::new(PasswordResetManager::new(
            pool.clone(),
            config.password_reset.clone(),
        ));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            user_manager,
            event_manager,
            moderation,
            activity_log,
            reset_manager,
            mailer,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
