mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderRecordRepo;
pub use postgres::PostgresReminderRecordRepo;

use followup_scheduler_domain::{ReminderKind, ReminderRecord, ID};

/// Durable store of reminder campaigns.
///
/// Every write bumps `version` in the store. `save` always wins while
/// `update_if_unchanged` only succeeds when nobody wrote the record since
/// it was read.
#[async_trait::async_trait]
pub trait IReminderRecordRepo: Send + Sync {
    async fn insert(&self, record: &ReminderRecord) -> anyhow::Result<()>;
    /// Overwrites the record and returns the new version
    async fn save(&self, record: &ReminderRecord) -> anyhow::Result<i64>;
    /// Overwrites the record if the stored version still equals `record.version`.
    /// Returns the new version, or `None` when the record was changed in the meantime.
    async fn update_if_unchanged(&self, record: &ReminderRecord) -> anyhow::Result<Option<i64>>;
    async fn find(&self, record_id: &ID) -> anyhow::Result<Option<ReminderRecord>>;
    /// The record of the subject and kind that is not cancelled, if any
    async fn find_non_cancelled(
        &self,
        subject_id: &ID,
        kind: ReminderKind,
    ) -> anyhow::Result<Option<ReminderRecord>>;
    async fn find_alive_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<ReminderRecord>>;
}
