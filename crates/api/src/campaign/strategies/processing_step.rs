use super::TriggerPredicate;
use chrono::{SecondsFormat, TimeZone, Utc};
use followup_scheduler_domain::{NotificationContent, ProcessingStep, ReminderRecord, ID};
use followup_scheduler_infra::FollowupContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepKind {
    Processing,
    Document,
}

/// Steps stay eligible while they were submitted but nobody completed them yet
pub struct StepEligibility {
    step_kind: StepKind,
}

impl StepEligibility {
    pub fn new(step_kind: StepKind) -> Self {
        Self { step_kind }
    }

    async fn find_step(
        &self,
        step_id: &ID,
        ctx: &FollowupContext,
    ) -> anyhow::Result<Option<ProcessingStep>> {
        ctx.repos.processing_step_repo.find(step_id).await
    }
}

fn to_iso(ts: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[async_trait::async_trait]
impl TriggerPredicate for StepEligibility {
    async fn still_eligible(&self, subject_id: &ID, ctx: &FollowupContext) -> anyhow::Result<bool> {
        Ok(self
            .find_step(subject_id, ctx)
            .await?
            .map(|step| step.awaits_completion())
            .unwrap_or(false))
    }

    async fn fallback_owner(
        &self,
        subject_id: &ID,
        ctx: &FollowupContext,
    ) -> anyhow::Result<Option<ID>> {
        let step = match self.find_step(subject_id, ctx).await? {
            Some(step) => step,
            None => return Ok(None),
        };
        if step.owner_id.is_some() {
            return Ok(step.owner_id);
        }
        let candidate = ctx.repos.candidate_repo.find(&step.candidate_id).await?;
        Ok(candidate.and_then(|candidate| candidate.owner_id))
    }

    async fn notification_content(
        &self,
        record: &ReminderRecord,
        ctx: &FollowupContext,
    ) -> anyhow::Result<NotificationContent> {
        let step = self.find_step(&record.subject_id, ctx).await?;
        let title = step
            .as_ref()
            .map(|step| step.title.clone())
            .unwrap_or_else(|| "A step".into());
        let candidate_id = step
            .as_ref()
            .map(|step| step.candidate_id.to_string())
            .unwrap_or_default();
        let submitted_at_iso = step.and_then(|step| step.submitted_at).and_then(to_iso);

        let content = match self.step_kind {
            StepKind::Processing => NotificationContent {
                notification_type: "processing_step_reminder".into(),
                title: format!("{} is waiting for you", title),
                message: format!("{} was submitted and still has to be processed.", title),
                link: format!("/candidates/{}/steps/{}", candidate_id, record.subject_id),
                submitted_at_iso,
            },
            StepKind::Document => NotificationContent {
                notification_type: "document_step_reminder".into(),
                title: format!("{} needs verification", title),
                message: format!("{} was uploaded and still has to be verified.", title),
                link: format!(
                    "/candidates/{}/documents/{}",
                    candidate_id, record.subject_id
                ),
                submitted_at_iso,
            },
        };
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followup_scheduler_domain::{Candidate, ReminderKind, StepStatus};

    async fn setup(step_owner: Option<ID>) -> (FollowupContext, Candidate, ProcessingStep) {
        let ctx = FollowupContext::create_inmemory();
        let candidate = Candidate {
            id: Default::default(),
            name: "Kari".into(),
            status: "screening".into(),
            owner_id: Some(Default::default()),
        };
        let step = ProcessingStep {
            id: Default::default(),
            candidate_id: candidate.id.clone(),
            title: "Passport".into(),
            status: StepStatus::Open,
            submitted_at: Some(0),
            owner_id: step_owner,
        };
        ctx.repos.candidate_repo.insert(&candidate).await.unwrap();
        ctx.repos.processing_step_repo.insert(&step).await.unwrap();
        (ctx, candidate, step)
    }

    #[actix_web::test]
    async fn submitted_open_steps_are_eligible() {
        let (ctx, _, mut step) = setup(None).await;
        let predicate = StepEligibility::new(StepKind::Processing);
        assert!(predicate.still_eligible(&step.id, &ctx).await.unwrap());

        step.status = StepStatus::Completed;
        ctx.repos.processing_step_repo.save(&step).await.unwrap();
        assert!(!predicate.still_eligible(&step.id, &ctx).await.unwrap());

        step.status = StepStatus::Open;
        step.submitted_at = None;
        ctx.repos.processing_step_repo.save(&step).await.unwrap();
        assert!(!predicate.still_eligible(&step.id, &ctx).await.unwrap());
    }

    #[actix_web::test]
    async fn it_falls_back_to_candidate_owner() {
        let (ctx, candidate, step) = setup(None).await;
        let predicate = StepEligibility::new(StepKind::Document);
        assert_eq!(
            predicate.fallback_owner(&step.id, &ctx).await.unwrap(),
            candidate.owner_id
        );

        let step_owner = ID::default();
        let (ctx, _, step) = setup(Some(step_owner.clone())).await;
        assert_eq!(
            predicate.fallback_owner(&step.id, &ctx).await.unwrap(),
            Some(step_owner)
        );
    }

    #[actix_web::test]
    async fn document_reminders_link_to_the_document() {
        let (ctx, candidate, step) = setup(None).await;
        let record = ReminderRecord::new(step.id.clone(), ReminderKind::DocumentStep, None, None, 0, 0);
        let content = StepEligibility::new(StepKind::Document)
            .notification_content(&record, &ctx)
            .await
            .unwrap();
        assert_eq!(
            content.link,
            format!("/candidates/{}/documents/{}", candidate.id, step.id)
        );
        assert_eq!(
            content.submitted_at_iso,
            Some("1970-01-01T00:00:00.000Z".to_string())
        );
    }
}
