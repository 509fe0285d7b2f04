mod campaign;
mod job;
mod notification;
mod reminder_kind;
pub mod scheduling;
mod settings;
mod shared;
pub mod slot;
mod subject;

pub use campaign::{CampaignProgress, ReminderRecord, ReminderStatus};
pub use chrono_tz::Tz;
pub use job::{
    retry_backoff_millis, DeadReminderJob, ReminderJob, ReminderJobPayload,
    ESCALATION_RECHECK_SEQUENCE,
};
pub use notification::{
    escalation_idempotency_key, reminder_idempotency_key, Notification, NotificationContent,
    NotificationMeta,
};
pub use reminder_kind::{InvalidReminderKindError, ReminderKind};
pub use settings::{
    EscalationSettings, EscalationStrategy, InvalidSettingsError, InvalidTimeOfDayError,
    OfficeHours, ReminderSettings, TimeOfDay, MAX_ESCALATION_AFTER_DAYS,
    MAX_INTER_REMINDER_DELAY_MINUTES,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use subject::{
    Candidate, CandidateAssignment, ProcessingStep, RoleMember, StepStatus, RNR_ESCALATION_ROLE,
    RNR_STATUS,
};
