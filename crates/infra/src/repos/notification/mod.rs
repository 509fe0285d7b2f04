mod inmemory;
mod postgres;

pub use inmemory::InMemoryNotificationRepo;
pub use postgres::PostgresNotificationRepo;

use followup_scheduler_domain::{Notification, ID};

#[async_trait::async_trait]
pub trait INotificationRepo: Send + Sync {
    /// Stores the notification unless one with the same idempotency key exists.
    /// Returns the stored notification and whether it was created by this call.
    async fn insert_idempotent(
        &self,
        notification: &Notification,
    ) -> anyhow::Result<(Notification, bool)>;
    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Notification>>;
    async fn find_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<Notification>>;
}
