use super::notification_sink::{push, REMINDER_EVENT};
use super::strategies::{EscalationHandler, EscalationOutcome, ReminderStrategy};
use crate::shared::usecase::UseCase;
use followup_scheduler_domain::{
    reminder_idempotency_key, CampaignProgress, Notification, ReminderJob, ReminderRecord,
    ReminderSettings, ReminderStatus, ID,
};
use followup_scheduler_infra::FollowupContext;
use tracing::{debug, info, warn};

/// Handles one due `ReminderJob`: sends the reminder that is due, moves the
/// campaign forward and enqueues the job for the next reminder. Runs the
/// escalation once the campaign is exhausted.
///
/// Jobs are delivered at least once, so handling the same job again must
/// neither send nor escalate twice. Only the job the record is linked to
/// is allowed to change the record, everything else is ignored.
#[derive(Debug)]
pub struct ProcessReminderJobUseCase {
    pub job: ReminderJob,
    pub strategy: ReminderStrategy,
}

impl ProcessReminderJobUseCase {
    pub fn new(job: ReminderJob) -> Self {
        let strategy = ReminderStrategy::for_kind(job.kind);
        Self { job, strategy }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job is stale, or the campaign was closed before it became due
    Ignored,
    /// Someone else wrote the record while the job was handled
    Superseded,
    /// The subject does not need any more reminders
    EligibilityLost,
    Rescheduled { next_at: i64 },
    Completed { escalated: bool },
    /// The campaign is exhausted and escalation is checked again at `run_at`
    AwaitingEscalationCheck { run_at: i64 },
}

/// Failures that leave the campaign in an unknown state. The job should be retried.
#[derive(Debug)]
pub enum UseCaseError {
    StorageError(String),
    EscalationFailed(String),
}

impl UseCaseError {
    fn storage(e: anyhow::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ProcessReminderJobUseCase {
    type Response = JobOutcome;

    type Errors = UseCaseError;

    const NAME: &'static str = "ProcessReminderJob";

    async fn execute(&mut self, ctx: &FollowupContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let record = ctx
            .repos
            .reminder_record_repo
            .find(&self.job.record_id)
            .await
            .map_err(UseCaseError::storage)?;
        let record = match record {
            Some(record) => record,
            None => {
                debug!("Record: {} of job: {} is gone", self.job.record_id, self.job.id);
                return Ok(JobOutcome::Ignored);
            }
        };

        if !record.is_linked_to(&self.job.id) {
            debug!(
                "Job: {} is not the current job of record: {}",
                self.job.id, record.id
            );
            self.requeue_lost_job(&record, ctx).await?;
            return Ok(JobOutcome::Ignored);
        }

        if self.job.is_escalation_recheck() {
            return self.recheck_escalation(record, ctx, now).await;
        }
        if record.is_terminal() {
            return Ok(JobOutcome::Ignored);
        }

        self.fire(record, ctx, now).await
    }
}

impl ProcessReminderJobUseCase {
    async fn fire(
        &self,
        mut record: ReminderRecord,
        ctx: &FollowupContext,
        now: i64,
    ) -> Result<JobOutcome, UseCaseError> {
        let settings = ctx
            .settings
            .get(record.kind, now)
            .await
            .map_err(UseCaseError::storage)?;

        match self
            .strategy
            .predicate
            .still_eligible(&record.subject_id, ctx)
            .await
        {
            Ok(true) => (),
            Ok(false) => {
                info!(
                    "Subject: {} no longer needs {} reminders",
                    record.subject_id, record.kind
                );
                record.complete(now);
                return self.finish(record, JobOutcome::EligibilityLost, ctx).await;
            }
            Err(e) => warn!(
                "Unable to check eligibility of subject: {}, reminding anyway. Error: {:?}",
                record.subject_id, e
            ),
        }

        // A sent record that is still linked to this job means the job is
        // redelivered after the reminder went out
        if record.status != ReminderStatus::Sent && !self.send(&mut record, ctx, now).await? {
            return Ok(JobOutcome::Superseded);
        }

        match record.advance(&settings, now) {
            CampaignProgress::Continue { next_at } => {
                let next_job = ReminderJob::new(
                    record.id.clone(),
                    record.subject_id.clone(),
                    record.kind,
                    record.owner_id.clone(),
                    self.job.sequence_number + 1,
                    next_at,
                );
                record.current_job_id = Some(next_job.id.clone());
                if !self.write(&mut record, ctx).await? {
                    return Ok(JobOutcome::Superseded);
                }
                self.enqueue(&next_job, ctx).await?;
                Ok(JobOutcome::Rescheduled { next_at })
            }
            CampaignProgress::Exhausted => self.exhaust(record, &settings, ctx, now).await,
        }
    }

    /// Delivers the reminder that is due and records it.
    /// Returns false when the record was changed by someone else in the meantime.
    async fn send(
        &self,
        record: &mut ReminderRecord,
        ctx: &FollowupContext,
        now: i64,
    ) -> Result<bool, UseCaseError> {
        let owner_id = match self.resolve_owner(record, ctx).await {
            Some(owner_id) => owner_id,
            None => {
                warn!(
                    "No owner to remind about subject: {} of record: {}",
                    record.subject_id, record.id
                );
                return Ok(true);
            }
        };

        let content = match self
            .strategy
            .predicate
            .notification_content(record, ctx)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Unable to build reminder for record: {}. Error: {:?}",
                    record.id, e
                );
                return Ok(true);
            }
        };
        let notification = Notification::new(
            owner_id.clone(),
            content,
            reminder_idempotency_key(&record.id, record.scheduled_for),
            record.subject_id.clone(),
            record.id.clone(),
            record.kind,
            now,
        );
        let (notification, created) = match ctx
            .repos
            .notification_repo
            .insert_idempotent(&notification)
            .await
        {
            Ok(res) => res,
            Err(e) => {
                warn!(
                    "Unable to store reminder for record: {}. Error: {:?}",
                    record.id, e
                );
                return Ok(true);
            }
        };

        record.register_send(owner_id, now);
        if !self.write(record, ctx).await? {
            return Ok(false);
        }
        if created {
            push(&notification, record, REMINDER_EVENT, ctx).await;
        }
        Ok(true)
    }

    async fn resolve_owner(&self, record: &ReminderRecord, ctx: &FollowupContext) -> Option<ID> {
        if let Some(owner_id) = self.job.owner_id.clone().or_else(|| record.owner_id.clone()) {
            return Some(owner_id);
        }
        match self
            .strategy
            .predicate
            .fallback_owner(&record.subject_id, ctx)
            .await
        {
            Ok(owner_id) => owner_id,
            Err(e) => {
                warn!(
                    "Unable to look up owner of subject: {}. Error: {:?}",
                    record.subject_id, e
                );
                None
            }
        }
    }

    async fn exhaust(
        &self,
        mut record: ReminderRecord,
        settings: &ReminderSettings,
        ctx: &FollowupContext,
        now: i64,
    ) -> Result<JobOutcome, UseCaseError> {
        let handler = match &self.strategy.escalation {
            Some(handler) if settings.escalation.enabled && !record.escalated => handler,
            _ => {
                record.complete(now);
                return self
                    .finish(record, JobOutcome::Completed { escalated: false }, ctx)
                    .await;
            }
        };

        if settings.escalation.after_days > 0 {
            let run_at = now.saturating_add(settings.escalation_delay_millis());
            let recheck = ReminderJob::escalation_recheck(
                record.id.clone(),
                record.subject_id.clone(),
                record.kind,
                record.owner_id.clone(),
                run_at,
            );
            record.complete(now);
            record.current_job_id = Some(recheck.id.clone());
            if !self.write(&mut record, ctx).await? {
                return Ok(JobOutcome::Superseded);
            }
            self.enqueue(&recheck, ctx).await?;
            return Ok(JobOutcome::AwaitingEscalationCheck { run_at });
        }

        let escalated = self
            .escalate(&mut record, &**handler, settings, ctx, now)
            .await?;
        record.complete(now);
        self.finish(record, JobOutcome::Completed { escalated }, ctx)
            .await
    }

    async fn recheck_escalation(
        &self,
        mut record: ReminderRecord,
        ctx: &FollowupContext,
        now: i64,
    ) -> Result<JobOutcome, UseCaseError> {
        record.current_job_id = None;
        record.updated = now;
        if record.status == ReminderStatus::Cancelled || record.escalated {
            return self.finish(record, JobOutcome::Ignored, ctx).await;
        }

        let settings = ctx
            .settings
            .get(record.kind, now)
            .await
            .map_err(UseCaseError::storage)?;

        match self
            .strategy
            .predicate
            .still_eligible(&record.subject_id, ctx)
            .await
        {
            Ok(true) => (),
            Ok(false) => return self.finish(record, JobOutcome::EligibilityLost, ctx).await,
            Err(e) => warn!(
                "Unable to check eligibility of subject: {}, escalating anyway. Error: {:?}",
                record.subject_id, e
            ),
        }

        let handler = match &self.strategy.escalation {
            Some(handler) if settings.escalation.enabled => handler,
            _ => {
                return self
                    .finish(record, JobOutcome::Completed { escalated: false }, ctx)
                    .await
            }
        };

        let already_escalated = handler
            .already_escalated(&record, ctx)
            .await
            .map_err(|e| UseCaseError::EscalationFailed(e.to_string()))?;
        if already_escalated {
            info!(
                "Subject: {} was escalated through another path",
                record.subject_id
            );
            return self
                .finish(record, JobOutcome::Completed { escalated: false }, ctx)
                .await;
        }

        let escalated = self
            .escalate(&mut record, &**handler, &settings, ctx, now)
            .await?;
        self.finish(record, JobOutcome::Completed { escalated }, ctx)
            .await
    }

    async fn escalate(
        &self,
        record: &mut ReminderRecord,
        handler: &dyn EscalationHandler,
        settings: &ReminderSettings,
        ctx: &FollowupContext,
        now: i64,
    ) -> Result<bool, UseCaseError> {
        match handler.escalate(record, &settings.escalation, ctx).await {
            Ok(EscalationOutcome::Escalated { to }) => {
                info!(
                    "Escalated {} campaign: {} to: {:?}",
                    record.kind, record.id, to
                );
                record.mark_escalated(to, now);
                Ok(true)
            }
            Ok(EscalationOutcome::Skipped) => Ok(false),
            Err(e) => Err(UseCaseError::EscalationFailed(e.to_string())),
        }
    }

    /// A job that was written to the record but never made it into the queue
    /// would stall the campaign. Enqueues it again.
    async fn requeue_lost_job(
        &self,
        record: &ReminderRecord,
        ctx: &FollowupContext,
    ) -> Result<(), UseCaseError> {
        let current_job_id = match &record.current_job_id {
            Some(job_id) if record.status != ReminderStatus::Cancelled => job_id,
            _ => return Ok(()),
        };
        let current_job = ctx
            .repos
            .reminder_job_repo
            .find(current_job_id)
            .await
            .map_err(UseCaseError::storage)?;
        if current_job.is_some() {
            return Ok(());
        }

        let mut job = if record.is_alive() {
            ReminderJob::new(
                record.id.clone(),
                record.subject_id.clone(),
                record.kind,
                record.owner_id.clone(),
                std::cmp::max(self.job.sequence_number, 0) + 1,
                record.scheduled_for,
            )
        } else {
            let settings = ctx
                .settings
                .get(record.kind, record.updated)
                .await
                .map_err(UseCaseError::storage)?;
            ReminderJob::escalation_recheck(
                record.id.clone(),
                record.subject_id.clone(),
                record.kind,
                record.owner_id.clone(),
                record.updated.saturating_add(settings.escalation_delay_millis()),
            )
        };
        job.id = current_job_id.clone();
        warn!(
            "Current job: {} of record: {} was missing from the queue, enqueuing it again",
            job.id, record.id
        );
        self.enqueue(&job, ctx).await
    }

    async fn finish(
        &self,
        mut record: ReminderRecord,
        outcome: JobOutcome,
        ctx: &FollowupContext,
    ) -> Result<JobOutcome, UseCaseError> {
        if self.write(&mut record, ctx).await? {
            Ok(outcome)
        } else {
            Ok(JobOutcome::Superseded)
        }
    }

    /// Writes the record unless it was changed since it was read
    async fn write(
        &self,
        record: &mut ReminderRecord,
        ctx: &FollowupContext,
    ) -> Result<bool, UseCaseError> {
        let version = ctx
            .repos
            .reminder_record_repo
            .update_if_unchanged(record)
            .await
            .map_err(UseCaseError::storage)?;
        match version {
            Some(version) => {
                record.version = version;
                Ok(true)
            }
            None => {
                info!(
                    "Record: {} was changed while job: {} was handled",
                    record.id, self.job.id
                );
                Ok(false)
            }
        }
    }

    async fn enqueue(&self, job: &ReminderJob, ctx: &FollowupContext) -> Result<(), UseCaseError> {
        ctx.repos
            .reminder_job_repo
            .enqueue(job)
            .await
            .map_err(UseCaseError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::close_campaigns::{CloseCampaignsUseCase, CloseReason};
    use crate::campaign::start_campaign::StartCampaignUseCase;
    use crate::campaign::strategies::TriggerPredicate;
    use crate::shared::usecase::execute;
    use chrono::TimeZone;
    use chrono_tz::UTC;
    use followup_scheduler_domain::{EscalationSettings, NotificationContent, ReminderKind};
    use followup_scheduler_infra::{
        INotificationRepo, IRealtimePublisher, IReminderRecordRepo, InMemoryRealtimePublisher,
        ManualSys,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ts(d: u32, h: u32, min: u32) -> i64 {
        UTC.with_ymd_and_hms(2021, 3, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    /// Shared switches and counters of the test strategy
    #[derive(Clone)]
    struct Switches {
        eligible: Arc<AtomicBool>,
        fail_eligibility: Arc<AtomicBool>,
        fail_content: Arc<AtomicBool>,
        escalated_elsewhere: Arc<AtomicBool>,
        fail_escalation: Arc<AtomicBool>,
        /// Writes the record from "outside" while the job is handled
        interfere: Arc<AtomicBool>,
        escalations: Arc<AtomicUsize>,
    }

    impl Switches {
        fn new() -> Self {
            Self {
                eligible: Arc::new(AtomicBool::new(true)),
                fail_eligibility: Arc::new(AtomicBool::new(false)),
                fail_content: Arc::new(AtomicBool::new(false)),
                escalated_elsewhere: Arc::new(AtomicBool::new(false)),
                fail_escalation: Arc::new(AtomicBool::new(false)),
                interfere: Arc::new(AtomicBool::new(false)),
                escalations: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn strategy(&self) -> ReminderStrategy {
            ReminderStrategy {
                predicate: Box::new(SwitchedPredicate(self.clone())),
                escalation: Some(Box::new(SwitchedEscalation(self.clone()))),
            }
        }

        fn escalations(&self) -> usize {
            self.escalations.load(Ordering::SeqCst)
        }
    }

    struct SwitchedPredicate(Switches);

    #[async_trait::async_trait]
    impl TriggerPredicate for SwitchedPredicate {
        async fn still_eligible(
            &self,
            subject_id: &ID,
            ctx: &FollowupContext,
        ) -> anyhow::Result<bool> {
            if self.0.interfere.load(Ordering::SeqCst) {
                let repo = &ctx.repos.reminder_record_repo;
                if let Some(record) = repo.find_non_cancelled(subject_id, ReminderKind::Rnr).await? {
                    repo.save(&record).await?;
                }
            }
            if self.0.fail_eligibility.load(Ordering::SeqCst) {
                return Err(anyhow::Error::msg("Subject directory is unavailable"));
            }
            Ok(self.0.eligible.load(Ordering::SeqCst))
        }

        async fn fallback_owner(
            &self,
            _subject_id: &ID,
            _ctx: &FollowupContext,
        ) -> anyhow::Result<Option<ID>> {
            Ok(None)
        }

        async fn notification_content(
            &self,
            record: &ReminderRecord,
            _ctx: &FollowupContext,
        ) -> anyhow::Result<NotificationContent> {
            if self.0.fail_content.load(Ordering::SeqCst) {
                return Err(anyhow::Error::msg("Subject has no title"));
            }
            Ok(NotificationContent {
                notification_type: "test_reminder".into(),
                title: "Reminder".into(),
                message: format!("Reminder {}", record.reminder_count + 1),
                link: format!("/subjects/{}", record.subject_id),
                submitted_at_iso: None,
            })
        }
    }

    struct SwitchedEscalation(Switches);

    #[async_trait::async_trait]
    impl EscalationHandler for SwitchedEscalation {
        async fn already_escalated(
            &self,
            _record: &ReminderRecord,
            _ctx: &FollowupContext,
        ) -> anyhow::Result<bool> {
            Ok(self.0.escalated_elsewhere.load(Ordering::SeqCst))
        }

        async fn escalate(
            &self,
            _record: &ReminderRecord,
            _settings: &EscalationSettings,
            _ctx: &FollowupContext,
        ) -> anyhow::Result<EscalationOutcome> {
            if self.0.fail_escalation.load(Ordering::SeqCst) {
                return Err(anyhow::Error::msg("Escalation role is unavailable"));
            }
            self.0.escalations.fetch_add(1, Ordering::SeqCst);
            Ok(EscalationOutcome::Escalated { to: None })
        }
    }

    struct FailingNotificationRepo {}

    #[async_trait::async_trait]
    impl INotificationRepo for FailingNotificationRepo {
        async fn insert_idempotent(
            &self,
            _notification: &Notification,
        ) -> anyhow::Result<(Notification, bool)> {
            Err(anyhow::Error::msg("Notification store is down"))
        }

        async fn find_by_idempotency_key(&self, _key: &str) -> anyhow::Result<Option<Notification>> {
            Err(anyhow::Error::msg("Notification store is down"))
        }

        async fn find_by_owner(&self, _owner_id: &ID) -> anyhow::Result<Vec<Notification>> {
            Err(anyhow::Error::msg("Notification store is down"))
        }
    }

    struct FailingRealtimePublisher {}

    #[async_trait::async_trait]
    impl IRealtimePublisher for FailingRealtimePublisher {
        async fn emit_to_owner(
            &self,
            _owner_id: &ID,
            _event_name: &str,
            _payload: serde_json::Value,
        ) -> anyhow::Result<()> {
            Err(anyhow::Error::msg("Connection refused"))
        }
    }

    /// Reads from the wrapped repo but refuses every write
    struct ReadOnlyRecordRepo(Arc<dyn IReminderRecordRepo>);

    #[async_trait::async_trait]
    impl IReminderRecordRepo for ReadOnlyRecordRepo {
        async fn insert(&self, _record: &ReminderRecord) -> anyhow::Result<()> {
            Err(anyhow::Error::msg("Record store is read only"))
        }

        async fn save(&self, _record: &ReminderRecord) -> anyhow::Result<i64> {
            Err(anyhow::Error::msg("Record store is read only"))
        }

        async fn update_if_unchanged(
            &self,
            _record: &ReminderRecord,
        ) -> anyhow::Result<Option<i64>> {
            Err(anyhow::Error::msg("Record store is read only"))
        }

        async fn find(&self, record_id: &ID) -> anyhow::Result<Option<ReminderRecord>> {
            self.0.find(record_id).await
        }

        async fn find_non_cancelled(
            &self,
            subject_id: &ID,
            kind: ReminderKind,
        ) -> anyhow::Result<Option<ReminderRecord>> {
            self.0.find_non_cancelled(subject_id, kind).await
        }

        async fn find_alive_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<ReminderRecord>> {
            self.0.find_alive_by_owner(owner_id).await
        }
    }

    struct TestContext {
        ctx: FollowupContext,
        sys: Arc<ManualSys>,
        realtime: Arc<InMemoryRealtimePublisher>,
        switches: Switches,
        subject_id: ID,
        owner_id: ID,
    }

    /// Three days with reminders at 09:00 and 15:00, the first one
    /// five minutes after the trigger
    async fn setup(escalation_after_days: u32) -> TestContext {
        let sys = Arc::new(ManualSys::new(ts(1, 9, 30)));
        let realtime = Arc::new(InMemoryRealtimePublisher::new());
        let mut ctx = FollowupContext::create_inmemory();
        ctx.sys = sys.clone();
        ctx.realtime = realtime.clone();

        let mut settings = ReminderSettings::default_for(ReminderKind::Rnr);
        settings.total_days = 3;
        settings.reminders_per_day = 2;
        settings.daily_times = vec!["09:00".parse().unwrap(), "15:00".parse().unwrap()];
        settings.inter_reminder_delay = 5;
        settings.escalation = EscalationSettings {
            enabled: true,
            after_days: escalation_after_days,
            strategy: Default::default(),
        };
        ctx.settings
            .update(ReminderKind::Rnr, &settings, 0)
            .await
            .unwrap();

        TestContext {
            ctx,
            sys,
            realtime,
            switches: Switches::new(),
            subject_id: ID::default(),
            owner_id: ID::default(),
        }
    }

    impl TestContext {
        async fn start(&self, owner_id: Option<ID>) -> ReminderRecord {
            execute(
                StartCampaignUseCase {
                    subject_id: self.subject_id.clone(),
                    kind: ReminderKind::Rnr,
                    owner_id,
                    trigger_ref: None,
                },
                &self.ctx,
            )
            .await
            .unwrap()
        }

        async fn record(&self, record_id: &ID) -> ReminderRecord {
            self.ctx
                .repos
                .reminder_record_repo
                .find(record_id)
                .await
                .unwrap()
                .unwrap()
        }

        async fn current_job(&self, record_id: &ID) -> Option<ReminderJob> {
            let job_id = self.record(record_id).await.current_job_id?;
            self.ctx.repos.reminder_job_repo.find(&job_id).await.unwrap()
        }

        async fn run(&self, job: &ReminderJob) -> Result<JobOutcome, UseCaseError> {
            let usecase = ProcessReminderJobUseCase {
                job: job.clone(),
                strategy: self.switches.strategy(),
            };
            execute(usecase, &self.ctx).await
        }

        /// Moves the clock to the current job of the record and handles it
        /// the way the worker does
        async fn fire_next(&self, record_id: &ID) -> Option<(ReminderJob, JobOutcome)> {
            let job = self.current_job(record_id).await?;
            self.sys.set(job.run_at);
            let outcome = self.run(&job).await.unwrap();
            self.ctx
                .repos
                .reminder_job_repo
                .complete(&job.id)
                .await
                .unwrap();
            Some((job, outcome))
        }

        async fn notification_count(&self) -> usize {
            self.ctx
                .repos
                .notification_repo
                .find_by_owner(&self.owner_id)
                .await
                .unwrap()
                .len()
        }
    }

    #[actix_web::test]
    async fn it_runs_a_campaign_to_escalation() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        assert_eq!(record.scheduled_for, ts(1, 9, 35));

        let mut fired_at = Vec::new();
        let mut last = None;
        while let Some((job, outcome)) = t.fire_next(&record.id).await {
            let r = t.record(&record.id).await;
            assert!(r.daily_count <= 2);
            assert!(r.days_completed <= 3);
            fired_at.push(job.run_at);
            last = Some((job, outcome));
        }

        assert_eq!(
            fired_at,
            vec![
                ts(1, 9, 35),
                ts(1, 15, 0),
                ts(2, 9, 0),
                ts(2, 15, 0),
                ts(3, 9, 0),
                ts(3, 15, 0),
            ]
        );
        let (last_job, last_outcome) = last.unwrap();
        assert_eq!(last_outcome, JobOutcome::Completed { escalated: true });

        let r = t.record(&record.id).await;
        assert_eq!(r.status, ReminderStatus::Completed);
        assert_eq!(r.reminder_count, 6);
        assert_eq!(r.days_completed, 3);
        assert!(r.escalated);
        assert_eq!(t.switches.escalations(), 1);
        assert_eq!(t.notification_count().await, 6);

        let events = t.realtime.events();
        assert_eq!(events.len(), 6);
        assert!(events
            .iter()
            .all(|e| e.event_name == REMINDER_EVENT && e.owner_id == t.owner_id));

        // Redelivery of the job that completed the campaign
        assert_eq!(t.run(&last_job).await.unwrap(), JobOutcome::Ignored);
        assert_eq!(t.switches.escalations(), 1);
        assert_eq!(t.notification_count().await, 6);
    }

    #[actix_web::test]
    async fn redelivered_job_is_ignored() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        let job = t.current_job(&record.id).await.unwrap();
        t.sys.set(job.run_at);

        assert_eq!(
            t.run(&job).await.unwrap(),
            JobOutcome::Rescheduled {
                next_at: ts(1, 15, 0)
            }
        );
        assert_eq!(t.run(&job).await.unwrap(), JobOutcome::Ignored);

        let r = t.record(&record.id).await;
        assert_eq!(r.reminder_count, 1);
        assert_eq!(r.daily_count, 1);
        assert_eq!(t.notification_count().await, 1);
        assert_eq!(t.realtime.events().len(), 1);
    }

    #[actix_web::test]
    async fn redelivery_after_the_send_does_not_send_again() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        let job = t.current_job(&record.id).await.unwrap();
        t.sys.set(job.run_at);

        // The reminder went out but the job never got to schedule the next one
        let mut r = t.record(&record.id).await;
        r.register_send(t.owner_id.clone(), job.run_at);
        t.ctx.repos.reminder_record_repo.save(&r).await.unwrap();

        assert_eq!(
            t.run(&job).await.unwrap(),
            JobOutcome::Rescheduled {
                next_at: ts(1, 15, 0)
            }
        );
        let r = t.record(&record.id).await;
        assert_eq!(r.reminder_count, 1);
        assert_eq!(r.status, ReminderStatus::Pending);
        assert_eq!(t.notification_count().await, 0);
    }

    #[actix_web::test]
    async fn it_completes_when_the_subject_is_resolved() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;

        t.fire_next(&record.id).await.unwrap();
        t.fire_next(&record.id).await.unwrap();
        t.switches.eligible.store(false, Ordering::SeqCst);
        let (_, outcome) = t.fire_next(&record.id).await.unwrap();
        assert_eq!(outcome, JobOutcome::EligibilityLost);

        let r = t.record(&record.id).await;
        assert_eq!(r.status, ReminderStatus::Completed);
        assert_eq!(r.reminder_count, 2);
        assert!(!r.escalated);
        assert!(r.current_job_id.is_none());
        assert_eq!(t.notification_count().await, 2);
        assert_eq!(t.switches.escalations(), 0);
        assert!(t.fire_next(&record.id).await.is_none());
    }

    #[actix_web::test]
    async fn cancel_stops_stray_jobs() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        t.fire_next(&record.id).await.unwrap();
        let stray = t.current_job(&record.id).await.unwrap();

        execute(
            CloseCampaignsUseCase {
                subject_id: t.subject_id.clone(),
                kind: Some(ReminderKind::Rnr),
                reason: CloseReason::Resolved,
            },
            &t.ctx,
        )
        .await
        .unwrap();
        assert!(t
            .ctx
            .repos
            .reminder_job_repo
            .find(&stray.id)
            .await
            .unwrap()
            .is_none());

        // Delivered anyway, e.g. because it was claimed before the cancel
        t.sys.set(stray.run_at);
        assert_eq!(t.run(&stray).await.unwrap(), JobOutcome::Ignored);
        assert_eq!(t.notification_count().await, 1);
        assert_eq!(
            t.record(&record.id).await.status,
            ReminderStatus::Completed
        );
    }

    #[actix_web::test]
    async fn restart_makes_old_jobs_stale() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        t.fire_next(&record.id).await.unwrap();
        let old_job = t.current_job(&record.id).await.unwrap();

        t.sys.set(ts(1, 12, 0));
        let restarted = t.start(Some(t.owner_id.clone())).await;
        assert_eq!(restarted.id, record.id);
        assert_eq!(restarted.reminder_count, 0);

        t.sys.set(old_job.run_at);
        assert_eq!(t.run(&old_job).await.unwrap(), JobOutcome::Ignored);
        let r = t.record(&record.id).await;
        assert_eq!(r.reminder_count, 0);
        assert_eq!(r.scheduled_for, ts(1, 12, 5));
    }

    #[actix_web::test]
    async fn concurrent_write_supersedes_the_fire() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        let job = t.current_job(&record.id).await.unwrap();
        t.sys.set(job.run_at);

        t.switches.interfere.store(true, Ordering::SeqCst);
        assert_eq!(t.run(&job).await.unwrap(), JobOutcome::Superseded);

        let r = t.record(&record.id).await;
        assert_eq!(r.reminder_count, 0);
        assert_eq!(r.status, ReminderStatus::Pending);
        assert!(t.realtime.events().is_empty());
    }

    #[actix_web::test]
    async fn campaign_without_owner_still_progresses() {
        let t = setup(0).await;
        let record = t.start(None).await;

        let (_, outcome) = t.fire_next(&record.id).await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Rescheduled {
                next_at: ts(1, 15, 0)
            }
        );
        let r = t.record(&record.id).await;
        assert_eq!(r.reminder_count, 0);
        assert_eq!(r.daily_count, 1);
        assert!(t.realtime.events().is_empty());
    }

    #[actix_web::test]
    async fn failed_escalation_is_retried_without_sending_again() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        for _ in 0..5 {
            t.fire_next(&record.id).await.unwrap();
        }
        let last_job = t.current_job(&record.id).await.unwrap();
        t.sys.set(last_job.run_at);

        t.switches.fail_escalation.store(true, Ordering::SeqCst);
        assert!(matches!(
            t.run(&last_job).await,
            Err(UseCaseError::EscalationFailed(_))
        ));
        let r = t.record(&record.id).await;
        assert!(r.is_linked_to(&last_job.id));
        assert_eq!(r.status, ReminderStatus::Sent);

        t.switches.fail_escalation.store(false, Ordering::SeqCst);
        assert_eq!(
            t.run(&last_job).await.unwrap(),
            JobOutcome::Completed { escalated: true }
        );
        assert_eq!(t.switches.escalations(), 1);
        assert_eq!(t.notification_count().await, 6);
        assert_eq!(t.record(&record.id).await.reminder_count, 6);
    }

    #[actix_web::test]
    async fn delayed_escalation_runs_on_recheck() {
        let t = setup(2).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        for _ in 0..5 {
            t.fire_next(&record.id).await.unwrap();
        }
        let (_, outcome) = t.fire_next(&record.id).await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::AwaitingEscalationCheck {
                run_at: ts(5, 15, 0)
            }
        );
        let r = t.record(&record.id).await;
        assert_eq!(r.status, ReminderStatus::Completed);
        assert!(!r.escalated);
        assert_eq!(t.switches.escalations(), 0);

        let (recheck, outcome) = t.fire_next(&record.id).await.unwrap();
        assert!(recheck.is_escalation_recheck());
        assert_eq!(outcome, JobOutcome::Completed { escalated: true });
        let r = t.record(&record.id).await;
        assert!(r.escalated);
        assert!(r.current_job_id.is_none());
        assert_eq!(t.switches.escalations(), 1);

        assert_eq!(t.run(&recheck).await.unwrap(), JobOutcome::Ignored);
        assert_eq!(t.switches.escalations(), 1);
    }

    #[actix_web::test]
    async fn recheck_skips_subjects_escalated_elsewhere() {
        let t = setup(1).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        for _ in 0..6 {
            t.fire_next(&record.id).await.unwrap();
        }

        t.switches.escalated_elsewhere.store(true, Ordering::SeqCst);
        let (_, outcome) = t.fire_next(&record.id).await.unwrap();
        assert_eq!(outcome, JobOutcome::Completed { escalated: false });
        assert_eq!(t.switches.escalations(), 0);
        assert!(!t.record(&record.id).await.escalated);
    }

    #[actix_web::test]
    async fn lost_job_is_enqueued_again() {
        let t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        let first = t.current_job(&record.id).await.unwrap();
        t.sys.set(first.run_at);
        t.run(&first).await.unwrap();

        // The next job was linked to the record but never reached the queue
        let next_job_id = t.record(&record.id).await.current_job_id.unwrap();
        t.ctx
            .repos
            .reminder_job_repo
            .delete(&next_job_id)
            .await
            .unwrap();

        // Retry of the first job
        assert_eq!(t.run(&first).await.unwrap(), JobOutcome::Ignored);
        let requeued = t.current_job(&record.id).await.unwrap();
        assert_eq!(requeued.id, next_job_id);
        assert_eq!(requeued.run_at, ts(1, 15, 0));

        let (_, outcome) = t.fire_next(&record.id).await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Rescheduled {
                next_at: ts(2, 9, 0)
            }
        );
    }

    /// Fires the first reminder of a fresh campaign and checks that it
    /// counted and that the next one was scheduled
    async fn assert_first_fire_progresses(t: &TestContext) {
        let record = t.start(Some(t.owner_id.clone())).await;
        let (_, outcome) = t.fire_next(&record.id).await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Rescheduled {
                next_at: ts(1, 15, 0)
            }
        );

        let r = t.record(&record.id).await;
        assert_eq!(r.daily_count, 1);
        assert_eq!(r.scheduled_for, ts(1, 15, 0));
        assert!(t.current_job(&record.id).await.is_some());
    }

    #[actix_web::test]
    async fn failing_eligibility_check_still_reminds() {
        let t = setup(0).await;
        t.switches.fail_eligibility.store(true, Ordering::SeqCst);

        assert_first_fire_progresses(&t).await;
        assert_eq!(t.notification_count().await, 1);
        assert_eq!(t.realtime.events().len(), 1);
    }

    #[actix_web::test]
    async fn failing_notification_content_is_skipped() {
        let t = setup(0).await;
        t.switches.fail_content.store(true, Ordering::SeqCst);

        assert_first_fire_progresses(&t).await;
        assert_eq!(t.notification_count().await, 0);
        assert!(t.realtime.events().is_empty());
    }

    #[actix_web::test]
    async fn failing_notification_store_is_skipped() {
        let mut t = setup(0).await;
        t.ctx.repos.notification_repo = Arc::new(FailingNotificationRepo {});

        assert_first_fire_progresses(&t).await;
        assert!(t.realtime.events().is_empty());
    }

    #[actix_web::test]
    async fn failing_realtime_push_is_skipped() {
        let mut t = setup(0).await;
        t.ctx.realtime = Arc::new(FailingRealtimePublisher {});

        assert_first_fire_progresses(&t).await;
        // The notification itself was stored
        assert_eq!(t.notification_count().await, 1);
    }

    #[actix_web::test]
    async fn failing_record_store_is_returned_for_retry() {
        let mut t = setup(0).await;
        let record = t.start(Some(t.owner_id.clone())).await;
        let job = t.current_job(&record.id).await.unwrap();
        t.sys.set(job.run_at);

        let records = t.ctx.repos.reminder_record_repo.clone();
        t.ctx.repos.reminder_record_repo = Arc::new(ReadOnlyRecordRepo(records.clone()));
        assert!(matches!(
            t.run(&job).await,
            Err(UseCaseError::StorageError(_))
        ));
        let r = t.record(&record.id).await;
        assert_eq!(r.daily_count, 0);
        assert!(r.is_linked_to(&job.id));

        // The retry once the store is back delivers the same reminder once
        t.ctx.repos.reminder_record_repo = records;
        assert_eq!(
            t.run(&job).await.unwrap(),
            JobOutcome::Rescheduled {
                next_at: ts(1, 15, 0)
            }
        );
        assert_eq!(t.record(&record.id).await.reminder_count, 1);
        assert_eq!(t.notification_count().await, 1);
    }
}
