use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use crate::error::FollowupError;
use actix_web::{web, HttpRequest, HttpResponse};
use followup_scheduler_api_structs::{cancel_campaign, dismiss_campaign};
use followup_scheduler_domain::{ReminderKind, ReminderRecord, ID};
use followup_scheduler_infra::FollowupContext;
use tracing::{info, warn};

pub async fn cancel_campaign_controller(
    http_req: HttpRequest,
    body: web::Json<cancel_campaign::RequestBody>,
    ctx: web::Data<FollowupContext>,
) -> Result<HttpResponse, FollowupError> {
    protect_route(&http_req, &ctx)?;

    let usecase = CloseCampaignsUseCase {
        subject_id: body.subject_id.clone(),
        kind: body.kind,
        reason: CloseReason::Resolved,
    };

    execute(usecase, &ctx)
        .await
        .map(|records| HttpResponse::Ok().json(cancel_campaign::APIResponse::new(records)))
        .map_err(FollowupError::from)
}

pub async fn dismiss_campaign_controller(
    http_req: HttpRequest,
    body: web::Json<dismiss_campaign::RequestBody>,
    ctx: web::Data<FollowupContext>,
) -> Result<HttpResponse, FollowupError> {
    protect_route(&http_req, &ctx)?;

    let usecase = CloseCampaignsUseCase {
        subject_id: body.subject_id.clone(),
        kind: body.kind,
        reason: CloseReason::Dismissed,
    };

    execute(usecase, &ctx)
        .await
        .map(|records| HttpResponse::Ok().json(dismiss_campaign::APIResponse::new(records)))
        .map_err(FollowupError::from)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseReason {
    /// The subject was taken care of, campaigns end as completed
    Resolved,
    /// A user does not want any more reminders, campaigns end as cancelled
    Dismissed,
}

/// Ends the running campaigns of a subject and removes their queued jobs.
/// Closing a subject without running campaigns does nothing.
#[derive(Debug)]
pub struct CloseCampaignsUseCase {
    pub subject_id: ID,
    /// Every kind when not given
    pub kind: Option<ReminderKind>,
    pub reason: CloseReason,
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
impl UseCase for CloseCampaignsUseCase {
    /// The records that were changed
    type Response = Vec<ReminderRecord>;

    type Errors = UseCaseError;

    const NAME: &'static str = "CloseCampaigns";

    async fn execute(&mut self, ctx: &FollowupContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let kinds = match self.kind {
            Some(kind) => vec![kind],
            None => ReminderKind::all().to_vec(),
        };

        let mut closed = Vec::new();
        for kind in kinds {
            let record = ctx
                .repos
                .reminder_record_repo
                .find_non_cancelled(&self.subject_id, kind)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            let mut record = match record {
                Some(record) => record,
                None => continue,
            };

            if record.is_alive() {
                match self.reason {
                    CloseReason::Resolved => record.complete(now),
                    CloseReason::Dismissed => record.cancel(now),
                }
            } else if record.current_job_id.is_some() {
                // Completed campaign still waiting for its escalation check
                record.current_job_id = None;
                record.updated = now;
            } else {
                continue;
            }

            record.version = ctx
                .repos
                .reminder_record_repo
                .save(&record)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            info!(
                "Closed {} campaign: {} as {}",
                kind, record.id, record.status
            );
            closed.push(record);
        }

        match ctx
            .repos
            .reminder_job_repo
            .delete_by_subject(&self.subject_id, self.kind)
            .await
        {
            Ok(res) if res.deleted_count > 0 => info!(
                "Removed {} queued jobs of subject: {}",
                res.deleted_count, self.subject_id
            ),
            Ok(_) => (),
            Err(e) => warn!(
                "Unable to remove queued jobs of subject: {}. Error: {:?}",
                self.subject_id, e
            ),
        }

        Ok(closed)
    }
}
