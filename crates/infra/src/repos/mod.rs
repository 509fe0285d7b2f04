mod candidate;
mod notification;
mod processing_step;
mod reminder_job;
mod reminder_record;
mod reminder_settings;
mod shared;

pub use candidate::ICandidateRepo;
use candidate::{InMemoryCandidateRepo, PostgresCandidateRepo};
pub use notification::INotificationRepo;
use notification::{InMemoryNotificationRepo, PostgresNotificationRepo};
pub use processing_step::IProcessingStepRepo;
use processing_step::{InMemoryProcessingStepRepo, PostgresProcessingStepRepo};
pub use reminder_job::IReminderJobRepo;
use reminder_job::{InMemoryReminderJobRepo, PostgresReminderJobRepo};
pub use reminder_record::IReminderRecordRepo;
use reminder_record::{InMemoryReminderRecordRepo, PostgresReminderRecordRepo};
pub use reminder_settings::IReminderSettingsRepo;
use reminder_settings::{InMemoryReminderSettingsRepo, PostgresReminderSettingsRepo};
pub use shared::repo::DeleteResult;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Repos {
    pub reminder_record_repo: Arc<dyn IReminderRecordRepo>,
    pub reminder_job_repo: Arc<dyn IReminderJobRepo>,
    pub reminder_settings_repo: Arc<dyn IReminderSettingsRepo>,
    pub notification_repo: Arc<dyn INotificationRepo>,
    pub candidate_repo: Arc<dyn ICandidateRepo>,
    pub processing_step_repo: Arc<dyn IProcessingStepRepo>,
}

impl Repos {
    pub async fn create_postgres(
        connection_string: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");

        Ok(Self {
            reminder_record_repo: Arc::new(PostgresReminderRecordRepo::new(pool.clone())),
            reminder_job_repo: Arc::new(PostgresReminderJobRepo::new(pool.clone())),
            reminder_settings_repo: Arc::new(PostgresReminderSettingsRepo::new(pool.clone())),
            notification_repo: Arc::new(PostgresNotificationRepo::new(pool.clone())),
            candidate_repo: Arc::new(PostgresCandidateRepo::new(pool.clone())),
            processing_step_repo: Arc::new(PostgresProcessingStepRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            reminder_record_repo: Arc::new(InMemoryReminderRecordRepo::new()),
            reminder_job_repo: Arc::new(InMemoryReminderJobRepo::new()),
            reminder_settings_repo: Arc::new(InMemoryReminderSettingsRepo::new()),
            notification_repo: Arc::new(InMemoryNotificationRepo::new()),
            candidate_repo: Arc::new(InMemoryCandidateRepo::new()),
            processing_step_repo: Arc::new(InMemoryProcessingStepRepo::new()),
        }
    }
}
