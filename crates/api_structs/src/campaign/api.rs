use crate::dtos::ReminderRecordDTO;
use followup_scheduler_domain::{ReminderKind, ReminderRecord, ID};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecordResponse {
    pub record: ReminderRecordDTO,
}

impl ReminderRecordResponse {
    pub fn new(record: ReminderRecord) -> Self {
        Self {
            record: ReminderRecordDTO::new(record),
        }
    }
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecordsResponse {
    pub records: Vec<ReminderRecordDTO>,
}

impl ReminderRecordsResponse {
    pub fn new(records: Vec<ReminderRecord>) -> Self {
        Self {
            records: records.into_iter().map(ReminderRecordDTO::new).collect(),
        }
    }
}

/// Identifies the campaigns of a subject, for one kind or for all of them
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCampaignsBody {
    pub subject_id: ID,
    #[serde(default)]
    pub kind: Option<ReminderKind>,
}

pub mod start_campaign {
    use super::*;

    #[derive(Deserialize, Serialize, Debug, Clone)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub subject_id: ID,
        pub kind: ReminderKind,
        #[serde(default)]
        pub owner_id: Option<ID>,
        #[serde(default)]
        pub trigger_ref: Option<ID>,
    }

    pub type APIResponse = ReminderRecordResponse;
}

pub mod cancel_campaign {
    use super::*;

    pub type RequestBody = SubjectCampaignsBody;

    pub type APIResponse = ReminderRecordsResponse;
}

pub mod dismiss_campaign {
    use super::*;

    pub type RequestBody = SubjectCampaignsBody;

    pub type APIResponse = ReminderRecordsResponse;
}

pub mod list_active_campaigns {
    use super::*;

    #[derive(Deserialize, Serialize)]
    pub struct PathParams {
        pub owner_id: ID,
    }

    pub type APIResponse = ReminderRecordsResponse;
}
