use super::IReminderRecordRepo;
use crate::repos::shared::inmemory_repo::*;
use followup_scheduler_domain::{ReminderKind, ReminderRecord, ReminderStatus, ID};
use std::sync::Mutex;

pub struct InMemoryReminderRecordRepo {
    records: Mutex<Vec<ReminderRecord>>,
}

impl InMemoryReminderRecordRepo {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderRecordRepo for InMemoryReminderRecordRepo {
    async fn insert(&self, record: &ReminderRecord) -> anyhow::Result<()> {
        insert(record, &self.records);
        Ok(())
    }

    async fn save(&self, record: &ReminderRecord) -> anyhow::Result<i64> {
        let updated = update_many(
            &self.records,
            |r| r.id == record.id,
            |r| {
                let version = r.version + 1;
                *r = record.clone();
                r.version = version;
            },
        );
        match updated.first() {
            Some(r) => Ok(r.version),
            None => Err(anyhow::Error::msg(format!(
                "Reminder record: {} does not exist",
                record.id
            ))),
        }
    }

    async fn update_if_unchanged(&self, record: &ReminderRecord) -> anyhow::Result<Option<i64>> {
        let updated = update_many(
            &self.records,
            |r| r.id == record.id && r.version == record.version,
            |r| {
                *r = record.clone();
                r.version = record.version + 1;
            },
        );
        Ok(updated.first().map(|r| r.version))
    }

    async fn find(&self, record_id: &ID) -> anyhow::Result<Option<ReminderRecord>> {
        Ok(find(record_id, &self.records))
    }

    async fn find_non_cancelled(
        &self,
        subject_id: &ID,
        kind: ReminderKind,
    ) -> anyhow::Result<Option<ReminderRecord>> {
        let records = find_by(&self.records, |r| {
            r.subject_id == *subject_id && r.kind == kind && r.status != ReminderStatus::Cancelled
        });
        Ok(records.into_iter().next())
    }

    async fn find_alive_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<ReminderRecord>> {
        Ok(find_by(&self.records, |r| {
            r.owner_id.as_ref() == Some(owner_id) && r.is_alive()
        }))
    }
}
