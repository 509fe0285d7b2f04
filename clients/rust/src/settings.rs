use crate::{APIResponse, BaseClient};
use followup_scheduler_api_structs::*;
use followup_scheduler_domain::{ReminderKind, ReminderSettings};
use reqwest::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct SettingsClient {
    base: Arc<BaseClient>,
}

impl SettingsClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn get(&self, kind: ReminderKind) -> APIResponse<get_reminder_settings::APIResponse> {
        self.base
            .get(format!("settings/{}", kind), StatusCode::OK)
            .await
    }

    pub async fn update(
        &self,
        kind: ReminderKind,
        settings: ReminderSettings,
    ) -> APIResponse<update_reminder_settings::APIResponse> {
        self.base
            .put(settings, format!("settings/{}", kind), StatusCode::OK)
            .await
    }
}
