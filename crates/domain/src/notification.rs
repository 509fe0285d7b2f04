use crate::{
    shared::entity::{Entity, ID},
    ReminderKind,
};
use serde::{Deserialize, Serialize};

/// A durable notification addressed to an owner.
///
/// Notifications are unique on `idempotency_key`; creating one with a key that
/// already exists returns the existing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: ID,
    pub owner_id: ID,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    /// Route in the web application that the notification links to
    pub link: String,
    pub idempotency_key: String,
    pub meta: NotificationMeta,
    pub read: bool,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMeta {
    pub subject_id: ID,
    pub record_id: ID,
    pub kind: ReminderKind,
    #[serde(default, rename = "submittedAtISO", skip_serializing_if = "Option::is_none")]
    pub submitted_at_iso: Option<String>,
}

/// The kind specific part of a notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContent {
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub link: String,
    pub submitted_at_iso: Option<String>,
}

impl Notification {
    pub fn new(
        owner_id: ID,
        content: NotificationContent,
        idempotency_key: String,
        subject_id: ID,
        record_id: ID,
        kind: ReminderKind,
        now: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            owner_id,
            notification_type: content.notification_type,
            title: content.title,
            message: content.message,
            link: content.link,
            idempotency_key,
            meta: NotificationMeta {
                subject_id,
                record_id,
                kind,
                submitted_at_iso: content.submitted_at_iso,
            },
            read: false,
            created: now,
        }
    }
}

impl Entity for Notification {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// Key of the reminder that is due at `scheduled_for`. Stable across
/// redeliveries of the same job, different for every reminder slot.
pub fn reminder_idempotency_key(record_id: &ID, scheduled_for: i64) -> String {
    format!("reminder:{}:{}", record_id, scheduled_for)
}

/// Key of the escalation of one run of a campaign. A reset starts a new run,
/// which may escalate to the same member again.
pub fn escalation_idempotency_key(record_id: &ID, started: i64, escalated_to: &ID) -> String {
    format!("escalation:{}:{}:{}", record_id, started, escalated_to)
}
