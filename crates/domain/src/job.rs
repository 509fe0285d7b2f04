use crate::{
    shared::entity::{Entity, ID},
    ReminderKind,
};
use serde::{Deserialize, Serialize};

/// Sequence number reserved for the job that re-checks escalation
/// after a completed campaign
pub const ESCALATION_RECHECK_SEQUENCE: i64 = -1;

/// A delayed job that advances a `ReminderRecord` when it becomes due.
///
/// Jobs are delivered at least once, so everything reacting to them has to
/// tolerate seeing the same job more than one time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderJob {
    pub id: ID,
    pub record_id: ID,
    pub subject_id: ID,
    pub kind: ReminderKind,
    pub owner_id: Option<ID>,
    /// Positive for regular reminders, `ESCALATION_RECHECK_SEQUENCE` for escalation re-checks
    pub sequence_number: i64,
    /// Timestamp at which the job becomes due
    pub run_at: i64,
    /// Failed delivery attempts so far
    pub attempts: i32,
    /// A claimed job is invisible to other workers until its lease expires
    pub locked_until: Option<i64>,
    pub last_error: Option<String>,
}

impl ReminderJob {
    pub fn new(
        record_id: ID,
        subject_id: ID,
        kind: ReminderKind,
        owner_id: Option<ID>,
        sequence_number: i64,
        run_at: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            record_id,
            subject_id,
            kind,
            owner_id,
            sequence_number,
            run_at,
            attempts: 0,
            locked_until: None,
            last_error: None,
        }
    }

    pub fn escalation_recheck(
        record_id: ID,
        subject_id: ID,
        kind: ReminderKind,
        owner_id: Option<ID>,
        run_at: i64,
    ) -> Self {
        Self::new(
            record_id,
            subject_id,
            kind,
            owner_id,
            ESCALATION_RECHECK_SEQUENCE,
            run_at,
        )
    }

    pub fn is_escalation_recheck(&self) -> bool {
        self.sequence_number == ESCALATION_RECHECK_SEQUENCE
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.run_at <= now && self.locked_until.map(|until| until <= now).unwrap_or(true)
    }

    /// The kind agnostic envelope of this job
    pub fn payload(&self) -> ReminderJobPayload {
        ReminderJobPayload {
            record_id: self.record_id.clone(),
            subject_id: self.subject_id.clone(),
            owner_id: self.owner_id.clone(),
            sequence_number: self.sequence_number,
        }
    }
}

impl Entity for ReminderJob {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderJobPayload {
    pub record_id: ID,
    pub subject_id: ID,
    pub owner_id: Option<ID>,
    pub sequence_number: i64,
}

/// A job that failed more often than allowed and needs an operator to look at it
#[derive(Debug, Clone, PartialEq)]
pub struct DeadReminderJob {
    pub job: ReminderJob,
    pub error: String,
    pub dead_at: i64,
}

/// Exponential backoff for a job that failed `attempts` times
pub fn retry_backoff_millis(base_millis: i64, attempts: i32) -> i64 {
    let exponent = std::cmp::max(attempts - 1, 0) as u32;
    base_millis.saturating_mul(2_i64.saturating_pow(exponent))
}
