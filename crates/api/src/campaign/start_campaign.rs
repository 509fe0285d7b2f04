use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use crate::error::FollowupError;
use actix_web::{web, HttpRequest, HttpResponse};
use followup_scheduler_api_structs::start_campaign::{APIResponse, RequestBody};
use followup_scheduler_domain::{ReminderJob, ReminderKind, ReminderRecord, ID};
use followup_scheduler_infra::FollowupContext;
use tracing::{info, warn};

pub async fn start_campaign_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<FollowupContext>,
) -> Result<HttpResponse, FollowupError> {
    protect_route(&http_req, &ctx)?;

    let body = body.0;
    let usecase = StartCampaignUseCase {
        subject_id: body.subject_id,
        kind: body.kind,
        owner_id: body.owner_id,
        trigger_ref: body.trigger_ref,
    };

    execute(usecase, &ctx)
        .await
        .map(|record| HttpResponse::Created().json(APIResponse::new(record)))
        .map_err(FollowupError::from)
}

/// Starts a reminder campaign for the subject, or restarts the one that
/// is already running for it.
#[derive(Debug)]
pub struct StartCampaignUseCase {
    pub subject_id: ID,
    pub kind: ReminderKind,
    pub owner_id: Option<ID>,
    pub trigger_ref: Option<ID>,
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
impl UseCase for StartCampaignUseCase {
    type Response = ReminderRecord;

    type Errors = UseCaseError;

    const NAME: &'static str = "StartCampaign";

    async fn execute(&mut self, ctx: &FollowupContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let settings = ctx
            .settings
            .get(self.kind, now)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let scheduled_for = now.saturating_add(settings.inter_reminder_delay_millis());

        let existing = ctx
            .repos
            .reminder_record_repo
            .find_non_cancelled(&self.subject_id, self.kind)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let record = match existing {
            Some(mut record) => {
                if let Err(e) = ctx
                    .repos
                    .reminder_job_repo
                    .delete_by_record(&record.id)
                    .await
                {
                    warn!(
                        "Unable to remove outstanding jobs of record: {}. Error: {:?}",
                        record.id, e
                    );
                }
                record.reset(
                    self.owner_id.clone(),
                    self.trigger_ref.clone(),
                    scheduled_for,
                    now,
                );
                let job = self.first_job(&record, scheduled_for);
                record.current_job_id = Some(job.id.clone());
                // Unconditional write, a fire that runs concurrently loses
                record.version = ctx
                    .repos
                    .reminder_record_repo
                    .save(&record)
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
                info!("Reset {} campaign: {}", self.kind, record.id);
                self.enqueue(&job, ctx).await?;
                record
            }
            None => {
                let mut record = ReminderRecord::new(
                    self.subject_id.clone(),
                    self.kind,
                    self.owner_id.clone(),
                    self.trigger_ref.clone(),
                    scheduled_for,
                    now,
                );
                let job = self.first_job(&record, scheduled_for);
                record.current_job_id = Some(job.id.clone());
                ctx.repos
                    .reminder_record_repo
                    .insert(&record)
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
                info!("Started {} campaign: {}", self.kind, record.id);
                self.enqueue(&job, ctx).await?;
                record
            }
        };

        Ok(record)
    }
}

impl StartCampaignUseCase {
    fn first_job(&self, record: &ReminderRecord, scheduled_for: i64) -> ReminderJob {
        ReminderJob::new(
            record.id.clone(),
            record.subject_id.clone(),
            record.kind,
            record.owner_id.clone(),
            1,
            scheduled_for,
        )
    }

    async fn enqueue(&self, job: &ReminderJob, ctx: &FollowupContext) -> Result<(), UseCaseError> {
        ctx.repos
            .reminder_job_repo
            .enqueue(job)
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followup_scheduler_domain::{ReminderSettings, ReminderStatus};
    use followup_scheduler_infra::ManualSys;
    use std::sync::Arc;

    fn setup(now: i64) -> FollowupContext {
        let mut ctx = FollowupContext::create_inmemory();
        ctx.sys = Arc::new(ManualSys::new(now));
        ctx
    }

    fn usecase(subject_id: &ID) -> StartCampaignUseCase {
        StartCampaignUseCase {
            subject_id: subject_id.clone(),
            kind: ReminderKind::Rnr,
            owner_id: Some(ID::default()),
            trigger_ref: None,
        }
    }

    #[actix_web::test]
    async fn it_creates_record_and_first_job() {
        let ctx = setup(1000);
        let subject_id = ID::default();

        let record = execute(usecase(&subject_id), &ctx).await.unwrap();
        // Default rnr delay is 30 minutes
        assert_eq!(record.scheduled_for, 1000 + 30 * 60 * 1000);
        assert_eq!(record.status, ReminderStatus::Pending);

        let jobs = ctx
            .repos
            .reminder_job_repo
            .find_by_record(&record.id)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].sequence_number, 1);
        assert_eq!(jobs[0].run_at, record.scheduled_for);
        assert!(record.is_linked_to(&jobs[0].id));
    }

    #[actix_web::test]
    async fn restart_resets_the_existing_record() {
        let ctx = setup(1000);
        let subject_id = ID::default();

        let mut first = execute(usecase(&subject_id), &ctx).await.unwrap();
        first.status = ReminderStatus::Sent;
        first.reminder_count = 4;
        first.daily_count = 1;
        first.days_completed = 2;
        ctx.repos.reminder_record_repo.save(&first).await.unwrap();

        let second = execute(usecase(&subject_id), &ctx).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, ReminderStatus::Pending);
        assert_eq!(
            (second.reminder_count, second.daily_count, second.days_completed),
            (0, 0, 0)
        );

        let stored = ctx
            .repos
            .reminder_record_repo
            .find_non_cancelled(&subject_id, ReminderKind::Rnr)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.reminder_count, 0);

        // Only the job of the restarted campaign is left
        let jobs = ctx
            .repos
            .reminder_job_repo
            .find_by_record(&first.id)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(stored.is_linked_to(&jobs[0].id));
    }

    #[actix_web::test]
    async fn restart_reopens_a_completed_campaign() {
        let ctx = setup(1000);
        let subject_id = ID::default();

        let mut first = execute(usecase(&subject_id), &ctx).await.unwrap();
        first.complete(2000);
        ctx.repos.reminder_record_repo.save(&first).await.unwrap();

        let second = execute(usecase(&subject_id), &ctx).await.unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.is_alive());
    }

    #[actix_web::test]
    async fn kinds_run_separate_campaigns() {
        let ctx = setup(1000);
        let subject_id = ID::default();

        let rnr = execute(usecase(&subject_id), &ctx).await.unwrap();
        let mut step_usecase = usecase(&subject_id);
        step_usecase.kind = ReminderKind::ProcessingStep;
        let step = execute(step_usecase, &ctx).await.unwrap();
        assert_ne!(rnr.id, step.id);
    }

    #[actix_web::test]
    async fn unvalidated_huge_delay_does_not_overflow() {
        let ctx = setup(1000);
        let mut settings = ReminderSettings::default_for(ReminderKind::Rnr);
        settings.inter_reminder_delay = i64::MAX / 1000;
        // Written around the validating provider
        ctx.repos
            .reminder_settings_repo
            .save(ReminderKind::Rnr, &settings, 0)
            .await
            .unwrap();

        let record = execute(usecase(&ID::default()), &ctx).await.unwrap();
        assert_eq!(record.scheduled_for, i64::MAX);
    }
}
