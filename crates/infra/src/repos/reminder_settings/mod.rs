mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderSettingsRepo;
pub use postgres::PostgresReminderSettingsRepo;

use followup_scheduler_domain::{ReminderKind, ReminderSettings};

#[async_trait::async_trait]
pub trait IReminderSettingsRepo: Send + Sync {
    async fn find(&self, kind: ReminderKind) -> anyhow::Result<Option<ReminderSettings>>;
    /// Creates or replaces the settings of a kind
    async fn save(
        &self,
        kind: ReminderKind,
        settings: &ReminderSettings,
        updated: i64,
    ) -> anyhow::Result<()>;
}
