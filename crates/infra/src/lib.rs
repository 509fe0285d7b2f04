mod config;
mod repos;
mod services;
mod settings_provider;
mod system;

pub use config::Config;
pub use repos::{
    DeleteResult, ICandidateRepo, INotificationRepo, IProcessingStepRepo, IReminderJobRepo,
    IReminderRecordRepo, IReminderSettingsRepo, Repos,
};
pub use services::*;
pub use settings_provider::{SettingsProvider, UpdateSettingsError};
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{ISys, ManualSys, RealSys};

#[derive(Clone)]
pub struct FollowupContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub settings: Arc<SettingsProvider>,
    pub realtime: Arc<dyn IRealtimePublisher>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl FollowupContext {
    fn new(repos: Repos, config: Config, realtime: Arc<dyn IRealtimePublisher>) -> Self {
        let settings = SettingsProvider::new(
            repos.reminder_settings_repo.clone(),
            config.settings_cache_ttl_millis,
        );
        Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            settings: Arc::new(settings),
            realtime,
        }
    }

    async fn create(params: ContextParams) -> Self {
        let repos = Repos::create_postgres(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        let config = Config::new();
        let realtime: Arc<dyn IRealtimePublisher> = match &config.realtime_webhook_url {
            Some(url) => Arc::new(WebhookRealtimePublisher::new(
                url.clone(),
                config.realtime_webhook_key.clone(),
            )),
            None => Arc::new(LogRealtimePublisher {}),
        };
        Self::new(repos, config, realtime)
    }

    /// Context backed by in-memory repositories. Realtime events are
    /// recorded instead of sent.
    pub fn create_inmemory() -> Self {
        Self::new(
            Repos::create_inmemory(),
            Config::new(),
            Arc::new(InMemoryRealtimePublisher::new()),
        )
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> FollowupContext {
    FollowupContext::create(ContextParams {
        postgres_connection_string: get_psql_connection_string(),
    })
    .await
}

fn get_psql_connection_string() -> String {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .unwrap_or_else(|_| panic!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration() -> Result<(), MigrateError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&get_psql_connection_string())
        .await
        .expect("TO CONNECT TO POSTGRES");

    sqlx::migrate!().run(&pool).await
}
