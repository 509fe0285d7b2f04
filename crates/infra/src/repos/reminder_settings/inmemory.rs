use super::IReminderSettingsRepo;
use followup_scheduler_domain::{ReminderKind, ReminderSettings};
use std::{collections::HashMap, sync::Mutex};

pub struct InMemoryReminderSettingsRepo {
    settings: Mutex<HashMap<ReminderKind, ReminderSettings>>,
}

impl InMemoryReminderSettingsRepo {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderSettingsRepo for InMemoryReminderSettingsRepo {
    async fn find(&self, kind: ReminderKind) -> anyhow::Result<Option<ReminderSettings>> {
        Ok(self.settings.lock().unwrap().get(&kind).cloned())
    }

    async fn save(
        &self,
        kind: ReminderKind,
        settings: &ReminderSettings,
        _updated: i64,
    ) -> anyhow::Result<()> {
        self.settings
            .lock()
            .unwrap()
            .insert(kind, settings.clone());
        Ok(())
    }
}
