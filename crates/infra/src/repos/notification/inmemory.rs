use super::INotificationRepo;
use crate::repos::shared::inmemory_repo::*;
use followup_scheduler_domain::{Notification, ID};
use std::sync::Mutex;

pub struct InMemoryNotificationRepo {
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationRepo {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl INotificationRepo for InMemoryNotificationRepo {
    async fn insert_idempotent(
        &self,
        notification: &Notification,
    ) -> anyhow::Result<(Notification, bool)> {
        let mut notifications = self.notifications.lock().unwrap();
        let existing = notifications
            .iter()
            .find(|n| n.idempotency_key == notification.idempotency_key);
        if let Some(existing) = existing {
            return Ok((existing.clone(), false));
        }
        notifications.push(notification.clone());
        Ok((notification.clone(), true))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Notification>> {
        Ok(find_by(&self.notifications, |n| n.idempotency_key == key)
            .into_iter()
            .next())
    }

    async fn find_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<Notification>> {
        Ok(find_by(&self.notifications, |n| n.owner_id == *owner_id))
    }
}
