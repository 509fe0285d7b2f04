use crate::{APIResponse, BaseClient};
use followup_scheduler_api_structs::*;
use followup_scheduler_domain::{ReminderKind, ID};
use reqwest::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct CampaignClient {
    base: Arc<BaseClient>,
}

pub struct StartCampaignInput {
    pub subject_id: ID,
    pub kind: ReminderKind,
    pub owner_id: Option<ID>,
    pub trigger_ref: Option<ID>,
}

/// Selects the campaigns of a subject. All kinds when `kind` is `None`.
pub struct CloseCampaignsInput {
    pub subject_id: ID,
    pub kind: Option<ReminderKind>,
}

impl From<CloseCampaignsInput> for SubjectCampaignsBody {
    fn from(input: CloseCampaignsInput) -> Self {
        Self {
            subject_id: input.subject_id,
            kind: input.kind,
        }
    }
}

impl CampaignClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn start(
        &self,
        input: StartCampaignInput,
    ) -> APIResponse<start_campaign::APIResponse> {
        let body = start_campaign::RequestBody {
            subject_id: input.subject_id,
            kind: input.kind,
            owner_id: input.owner_id,
            trigger_ref: input.trigger_ref,
        };
        self.base
            .post(body, "campaigns".into(), StatusCode::CREATED)
            .await
    }

    pub async fn cancel(
        &self,
        input: CloseCampaignsInput,
    ) -> APIResponse<cancel_campaign::APIResponse> {
        let body: cancel_campaign::RequestBody = input.into();
        self.base
            .post(body, "campaigns/cancel".into(), StatusCode::OK)
            .await
    }

    pub async fn dismiss(
        &self,
        input: CloseCampaignsInput,
    ) -> APIResponse<dismiss_campaign::APIResponse> {
        let body: dismiss_campaign::RequestBody = input.into();
        self.base
            .post(body, "campaigns/dismiss".into(), StatusCode::OK)
            .await
    }

    pub async fn list_active(
        &self,
        owner_id: ID,
    ) -> APIResponse<list_active_campaigns::APIResponse> {
        self.base
            .get(format!("owners/{}/campaigns", owner_id), StatusCode::OK)
            .await
    }
}
