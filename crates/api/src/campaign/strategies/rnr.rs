use super::{EscalationHandler, EscalationOutcome, TriggerPredicate};
use crate::campaign::notification_sink::{deliver, ESCALATION_EVENT};
use followup_scheduler_domain::{
    escalation_idempotency_key, scheduling::assign_role_member, CandidateAssignment,
    EscalationSettings, Notification, NotificationContent, ReminderRecord, ID,
    RNR_ESCALATION_ROLE,
};
use followup_scheduler_infra::FollowupContext;
use tracing::{info, warn};

/// Candidates stay eligible while they are marked as "ringing, no response"
pub struct RnrEligibility {}

#[async_trait::async_trait]
impl TriggerPredicate for RnrEligibility {
    async fn still_eligible(&self, subject_id: &ID, ctx: &FollowupContext) -> anyhow::Result<bool> {
        let candidate = ctx.repos.candidate_repo.find(subject_id).await?;
        Ok(candidate
            .map(|candidate| candidate.is_awaiting_response())
            .unwrap_or(false))
    }

    async fn fallback_owner(
        &self,
        subject_id: &ID,
        ctx: &FollowupContext,
    ) -> anyhow::Result<Option<ID>> {
        let candidate = ctx.repos.candidate_repo.find(subject_id).await?;
        Ok(candidate.and_then(|candidate| candidate.owner_id))
    }

    async fn notification_content(
        &self,
        record: &ReminderRecord,
        ctx: &FollowupContext,
    ) -> anyhow::Result<NotificationContent> {
        let name = ctx
            .repos
            .candidate_repo
            .find(&record.subject_id)
            .await?
            .map(|candidate| candidate.name)
            .unwrap_or_else(|| "A candidate".into());

        Ok(NotificationContent {
            notification_type: "rnr_reminder".into(),
            title: format!("Call back {}", name),
            message: format!(
                "{} did not answer the last call. This is reminder {} to try again.",
                name,
                record.reminder_count + 1
            ),
            link: format!("/candidates/{}", record.subject_id),
            submitted_at_iso: None,
        })
    }
}

/// Hands the candidate over to a member of the escalation role when the
/// owner did not manage to reach them
pub struct RnrEscalation {}

#[async_trait::async_trait]
impl EscalationHandler for RnrEscalation {
    async fn already_escalated(
        &self,
        record: &ReminderRecord,
        ctx: &FollowupContext,
    ) -> anyhow::Result<bool> {
        let assignment = ctx
            .repos
            .candidate_repo
            .find_active_assignment(&record.subject_id, RNR_ESCALATION_ROLE)
            .await?;
        Ok(assignment.is_some())
    }

    async fn escalate(
        &self,
        record: &ReminderRecord,
        settings: &EscalationSettings,
        ctx: &FollowupContext,
    ) -> anyhow::Result<EscalationOutcome> {
        if self.already_escalated(record, ctx).await? {
            info!(
                "Candidate: {} already has an active {}, skipping escalation",
                record.subject_id, RNR_ESCALATION_ROLE
            );
            return Ok(EscalationOutcome::Skipped);
        }

        let members = ctx
            .repos
            .candidate_repo
            .find_role_members(RNR_ESCALATION_ROLE)
            .await?;
        let excluded = record.owner_id.iter().cloned().collect::<Vec<_>>();
        let assignee = match assign_role_member(settings.strategy, members, &excluded) {
            Some(assignee) => assignee,
            None => {
                warn!(
                    "No member of role {} can take over candidate: {}",
                    RNR_ESCALATION_ROLE, record.subject_id
                );
                return Ok(EscalationOutcome::Skipped);
            }
        };

        let now = ctx.sys.get_timestamp_millis();
        let assignment = CandidateAssignment::new(
            record.subject_id.clone(),
            assignee.clone(),
            RNR_ESCALATION_ROLE,
            now,
        );
        ctx.repos.candidate_repo.assign(&assignment).await?;

        let name = ctx
            .repos
            .candidate_repo
            .find(&record.subject_id)
            .await?
            .map(|candidate| candidate.name)
            .unwrap_or_else(|| "A candidate".into());
        let notification = Notification::new(
            assignee.clone(),
            NotificationContent {
                notification_type: "rnr_escalation".into(),
                title: format!("{} was escalated to you", name),
                message: format!(
                    "{} did not answer after {} reminders and is now yours to call.",
                    name, record.reminder_count
                ),
                link: format!("/candidates/{}", record.subject_id),
                submitted_at_iso: None,
            },
            escalation_idempotency_key(&record.id, record.started, &assignee),
            record.subject_id.clone(),
            record.id.clone(),
            record.kind,
            now,
        );
        if let Err(e) = deliver(&notification, record, ESCALATION_EVENT, ctx).await {
            warn!(
                "Unable to notify {} about escalated candidate: {}. Error: {:?}",
                assignee, record.subject_id, e
            );
        }

        info!(
            "Escalated candidate: {} to user: {}",
            record.subject_id, assignee
        );
        Ok(EscalationOutcome::Escalated { to: Some(assignee) })
    }
}
