mod base;
mod campaign;
mod settings;
mod status;

pub(crate) use base::BaseClient;
pub use base::{APIError, APIErrorVariant, APIResponse};
use campaign::CampaignClient;
pub use campaign::{CloseCampaignsInput, StartCampaignInput};
pub use followup_scheduler_api_structs::dtos::*;
pub use followup_scheduler_domain::{
    EscalationSettings, EscalationStrategy, OfficeHours, ReminderKind, ReminderSettings,
    ReminderStatus, TimeOfDay, Tz, ID,
};
use settings::SettingsClient;
use status::StatusClient;
use std::sync::Arc;

pub use followup_scheduler_api_structs::dtos::ReminderRecordDTO as ReminderRecord;

/// Followup Scheduler Server SDK
///
/// The SDK contains methods for interacting with the Followup Scheduler
/// server API.
#[derive(Clone)]
pub struct FollowupSDK {
    pub campaign: CampaignClient,
    pub settings: SettingsClient,
    pub status: StatusClient,
}

impl FollowupSDK {
    pub fn new<T: Into<String>>(address: String, api_key: T) -> Self {
        let mut base = BaseClient::new(address);
        base.set_api_key(api_key.into());
        let base = Arc::new(base);
        let campaign = CampaignClient::new(base.clone());
        let settings = SettingsClient::new(base.clone());
        let status = StatusClient::new(base);

        Self {
            campaign,
            settings,
            status,
        }
    }
}
