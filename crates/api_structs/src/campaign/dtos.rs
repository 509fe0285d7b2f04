use followup_scheduler_domain::{ReminderKind, ReminderRecord, ReminderStatus, ID};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecordDTO {
    pub id: ID,
    pub subject_id: ID,
    pub kind: ReminderKind,
    pub owner_id: Option<ID>,
    pub status: ReminderStatus,
    pub scheduled_for: i64,
    pub sent_at: Option<i64>,
    pub reminder_count: u32,
    pub daily_count: u32,
    pub days_completed: u32,
    pub last_reminder_date: Option<i64>,
    pub escalated: bool,
    pub escalated_at: Option<i64>,
    pub escalated_to: Option<ID>,
    pub trigger_ref: Option<ID>,
    pub created: i64,
    pub updated: i64,
}

impl ReminderRecordDTO {
    pub fn new(record: ReminderRecord) -> Self {
        Self {
            id: record.id,
            subject_id: record.subject_id,
            kind: record.kind,
            owner_id: record.owner_id,
            status: record.status,
            scheduled_for: record.scheduled_for,
            sent_at: record.sent_at,
            reminder_count: record.reminder_count,
            daily_count: record.daily_count,
            days_completed: record.days_completed,
            last_reminder_date: record.last_reminder_date,
            escalated: record.escalated,
            escalated_at: record.escalated_at,
            escalated_to: record.escalated_to,
            trigger_ref: record.trigger_ref,
            created: record.created,
            updated: record.updated,
        }
    }
}
