mod processing_step;
mod rnr;

pub use processing_step::{StepEligibility, StepKind};
pub use rnr::{RnrEligibility, RnrEscalation};

use followup_scheduler_domain::{
    EscalationSettings, NotificationContent, ReminderKind, ReminderRecord, ID,
};
use followup_scheduler_infra::FollowupContext;

/// Decides whether the subject of a campaign still needs reminders and
/// what they say
#[async_trait::async_trait]
pub trait TriggerPredicate: Send + Sync {
    async fn still_eligible(&self, subject_id: &ID, ctx: &FollowupContext) -> anyhow::Result<bool>;

    /// Who receives the reminder when neither the job nor the record name an owner
    async fn fallback_owner(
        &self,
        subject_id: &ID,
        ctx: &FollowupContext,
    ) -> anyhow::Result<Option<ID>>;

    async fn notification_content(
        &self,
        record: &ReminderRecord,
        ctx: &FollowupContext,
    ) -> anyhow::Result<NotificationContent>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    Escalated { to: Option<ID> },
    /// Nothing was done, e.g. because the subject already has someone in
    /// the escalation role or nobody can take it over
    Skipped,
}

/// One time action taken when a campaign ran out without the subject being resolved
#[async_trait::async_trait]
pub trait EscalationHandler: Send + Sync {
    /// Whether the subject was escalated already, through this campaign or any other path
    async fn already_escalated(
        &self,
        record: &ReminderRecord,
        ctx: &FollowupContext,
    ) -> anyhow::Result<bool>;

    async fn escalate(
        &self,
        record: &ReminderRecord,
        settings: &EscalationSettings,
        ctx: &FollowupContext,
    ) -> anyhow::Result<EscalationOutcome>;
}

/// The kind specific rules that the generic reminder processor runs with
pub struct ReminderStrategy {
    pub predicate: Box<dyn TriggerPredicate>,
    pub escalation: Option<Box<dyn EscalationHandler>>,
}

impl std::fmt::Debug for ReminderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderStrategy")
            .field("escalates", &self.escalation.is_some())
            .finish()
    }
}

impl ReminderStrategy {
    pub fn for_kind(kind: ReminderKind) -> Self {
        match kind {
            ReminderKind::Rnr => Self {
                predicate: Box::new(RnrEligibility {}),
                escalation: Some(Box::new(RnrEscalation {})),
            },
            ReminderKind::ProcessingStep => Self {
                predicate: Box::new(StepEligibility::new(StepKind::Processing)),
                escalation: None,
            },
            ReminderKind::DocumentStep => Self {
                predicate: Box::new(StepEligibility::new(StepKind::Document)),
                escalation: None,
            },
        }
    }
}
