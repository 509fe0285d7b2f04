use followup_scheduler_domain::{ReminderKind, ReminderSettings};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettingsResponse {
    pub kind: ReminderKind,
    pub settings: ReminderSettings,
}

impl ReminderSettingsResponse {
    pub fn new(kind: ReminderKind, settings: ReminderSettings) -> Self {
        Self { kind, settings }
    }
}

pub mod get_reminder_settings {
    use super::*;

    #[derive(Deserialize, Serialize)]
    pub struct PathParams {
        pub kind: String,
    }

    pub type APIResponse = ReminderSettingsResponse;
}

pub mod update_reminder_settings {
    use super::*;

    #[derive(Deserialize, Serialize)]
    pub struct PathParams {
        pub kind: String,
    }

    pub type RequestBody = ReminderSettings;

    pub type APIResponse = ReminderSettingsResponse;
}
