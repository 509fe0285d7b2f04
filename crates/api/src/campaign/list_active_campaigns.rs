use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use crate::error::FollowupError;
use actix_web::{web, HttpRequest, HttpResponse};
use followup_scheduler_api_structs::list_active_campaigns::{APIResponse, PathParams};
use followup_scheduler_domain::{ReminderRecord, ID};
use followup_scheduler_infra::FollowupContext;

pub async fn list_active_campaigns_controller(
    http_req: HttpRequest,
    path: web::Path<PathParams>,
    ctx: web::Data<FollowupContext>,
) -> Result<HttpResponse, FollowupError> {
    protect_route(&http_req, &ctx)?;

    let usecase = ListActiveCampaignsUseCase {
        owner_id: path.owner_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|records| HttpResponse::Ok().json(APIResponse::new(records)))
        .map_err(FollowupError::from)
}

#[derive(Debug)]
pub struct ListActiveCampaignsUseCase {
    pub owner_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for FollowupError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ListActiveCampaignsUseCase {
    type Response = Vec<ReminderRecord>;

    type Errors = UseCaseError;

    const NAME: &'static str = "ListActiveCampaigns";

    async fn execute(&mut self, ctx: &FollowupContext) -> Result<Self::Response, Self::Errors> {
        let mut records = ctx
            .repos
            .reminder_record_repo
            .find_alive_by_owner(&self.owner_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        records.sort_by_key(|r| r.scheduled_for);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::close_campaigns::{CloseCampaignsUseCase, CloseReason};
    use crate::campaign::start_campaign::StartCampaignUseCase;
    use followup_scheduler_domain::ReminderKind;

    #[actix_web::test]
    async fn it_lists_running_campaigns_of_owner() {
        let ctx = FollowupContext::create_inmemory();
        let owner_id = ID::default();
        let subjects = vec![ID::default(), ID::default(), ID::default()];
        for subject_id in &subjects {
            execute(
                StartCampaignUseCase {
                    subject_id: subject_id.clone(),
                    kind: ReminderKind::ProcessingStep,
                    owner_id: Some(owner_id.clone()),
                    trigger_ref: None,
                },
                &ctx,
            )
            .await
            .unwrap();
        }
        execute(
            StartCampaignUseCase {
                subject_id: ID::default(),
                kind: ReminderKind::ProcessingStep,
                owner_id: Some(ID::default()),
                trigger_ref: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        execute(
            CloseCampaignsUseCase {
                subject_id: subjects[0].clone(),
                kind: None,
                reason: CloseReason::Dismissed,
            },
            &ctx,
        )
        .await
        .unwrap();

        let records = execute(
            ListActiveCampaignsUseCase {
                owner_id: owner_id.clone(),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.owner_id.as_ref() == Some(&owner_id) && r.is_alive()));
    }
}
