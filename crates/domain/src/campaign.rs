use crate::{
    shared::entity::{Entity, ID},
    slot::{first_slot_next_day, is_same_day, next_same_day_slot},
    ReminderKind, ReminderSettings,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderStatus {
    /// Waiting for the next reminder to fire
    Pending,
    /// A reminder was just delivered
    Sent,
    /// The campaign ran out, or the subject no longer needs reminders
    Completed,
    /// Explicitly dismissed by a user
    Cancelled,
}

impl ReminderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown reminder status: {}", s)),
        }
    }
}

/// A `ReminderRecord` is one reminder campaign for a subject: a bounded series of
/// reminders over several days which ends with an optional escalation.
///
/// There is at most one non cancelled record per subject and `ReminderKind`. A new
/// trigger resets that record instead of creating another one, so the record keeps
/// its id for the whole lifetime of the campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRecord {
    pub id: ID,
    pub subject_id: ID,
    pub kind: ReminderKind,
    /// The actor currently responsible for the subject, receives the reminders
    pub owner_id: Option<ID>,
    pub status: ReminderStatus,
    /// Timestamp of the next due reminder
    pub scheduled_for: i64,
    /// Timestamp of the most recent delivered reminder
    pub sent_at: Option<i64>,
    /// Lifetime number of delivered reminders
    pub reminder_count: u32,
    /// Reminders fired on the current day
    pub daily_count: u32,
    /// Days for which the daily quota was reached
    pub days_completed: u32,
    /// Timestamp of the latest fire, used to detect day rollover
    pub last_reminder_date: Option<i64>,
    pub escalated: bool,
    pub escalated_at: Option<i64>,
    pub escalated_to: Option<ID>,
    /// The business event that started (or last reset) this campaign
    pub trigger_ref: Option<ID>,
    /// The single delayed job that is allowed to advance this record.
    /// Jobs with any other id are stale and must be ignored.
    pub current_job_id: Option<ID>,
    /// Incremented on every write, used for optimistic concurrency control
    pub version: i64,
    /// When the current run of the campaign started, set again on every reset
    pub started: i64,
    pub created: i64,
    pub updated: i64,
}

/// Result of accounting one fire against the campaign quota
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignProgress {
    /// Another reminder is due at the given timestamp
    Continue { next_at: i64 },
    /// All days reached their quota
    Exhausted,
}

impl ReminderRecord {
    pub fn new(
        subject_id: ID,
        kind: ReminderKind,
        owner_id: Option<ID>,
        trigger_ref: Option<ID>,
        scheduled_for: i64,
        now: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            subject_id,
            kind,
            owner_id,
            status: ReminderStatus::Pending,
            scheduled_for,
            sent_at: None,
            reminder_count: 0,
            daily_count: 0,
            days_completed: 0,
            last_reminder_date: None,
            escalated: false,
            escalated_at: None,
            escalated_to: None,
            trigger_ref,
            current_job_id: None,
            version: 0,
            started: now,
            created: now,
            updated: now,
        }
    }

    /// Restarts the campaign in place for a new trigger
    pub fn reset(
        &mut self,
        owner_id: Option<ID>,
        trigger_ref: Option<ID>,
        scheduled_for: i64,
        now: i64,
    ) {
        self.owner_id = owner_id;
        self.trigger_ref = trigger_ref;
        self.status = ReminderStatus::Pending;
        self.scheduled_for = scheduled_for;
        self.sent_at = None;
        self.reminder_count = 0;
        self.daily_count = 0;
        self.days_completed = 0;
        self.last_reminder_date = None;
        self.escalated = false;
        self.escalated_at = None;
        self.escalated_to = None;
        self.current_job_id = None;
        self.started = now;
        self.updated = now;
    }

    pub fn is_alive(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the given job is the one this record is waiting for
    pub fn is_linked_to(&self, job_id: &ID) -> bool {
        self.current_job_id.as_ref() == Some(job_id)
    }

    pub fn register_send(&mut self, owner_id: ID, now: i64) {
        self.status = ReminderStatus::Sent;
        self.sent_at = Some(now);
        self.reminder_count += 1;
        self.owner_id = Some(owner_id);
        self.updated = now;
    }

    pub fn complete(&mut self, now: i64) {
        self.status = ReminderStatus::Completed;
        self.current_job_id = None;
        self.updated = now;
    }

    pub fn cancel(&mut self, now: i64) {
        self.status = ReminderStatus::Cancelled;
        self.current_job_id = None;
        self.updated = now;
    }

    pub fn mark_escalated(&mut self, escalated_to: Option<ID>, now: i64) {
        self.escalated = true;
        self.escalated_at = Some(now);
        self.escalated_to = escalated_to;
        self.updated = now;
    }

    /// Accounts the fire of the currently scheduled reminder against the daily
    /// and total quota and decides when the next one is due.
    ///
    /// Every fire consumes a daily slot, whether a notification could be
    /// delivered or not, so that a campaign always progresses. A day only counts
    /// as completed when its quota was reached; a first day that runs out of
    /// slots early continues on the next day.
    pub fn advance(&mut self, settings: &ReminderSettings, now: i64) -> CampaignProgress {
        let tz = &settings.timezone;
        let quota = settings.daily_quota();
        let fired_at = std::cmp::max(self.scheduled_for, now);

        if let Some(last) = self.last_reminder_date {
            if !is_same_day(last, self.scheduled_for, tz) {
                self.daily_count = 0;
            }
        }
        self.daily_count = std::cmp::min(self.daily_count + 1, quota);
        self.last_reminder_date = Some(fired_at);
        self.status = ReminderStatus::Pending;
        self.updated = now;

        if self.daily_count < quota {
            let next_at = match next_same_day_slot(fired_at, settings) {
                Some(next_at) => next_at,
                None => {
                    self.daily_count = 0;
                    first_slot_next_day(fired_at, settings)
                }
            };
            self.scheduled_for = next_at;
            return CampaignProgress::Continue { next_at };
        }

        self.days_completed = std::cmp::min(self.days_completed + 1, settings.total_days);
        if self.days_completed < settings.total_days {
            self.daily_count = 0;
            let next_at = first_slot_next_day(fired_at, settings);
            self.scheduled_for = next_at;
            CampaignProgress::Continue { next_at }
        } else {
            CampaignProgress::Exhausted
        }
    }
}

impl Entity for ReminderRecord {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;

    fn ts(d: u32, h: u32, min: u32) -> i64 {
        UTC.with_ymd_and_hms(2021, 3, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn settings() -> ReminderSettings {
        let mut s = ReminderSettings::default_for(ReminderKind::Rnr);
        s.total_days = 3;
        s.reminders_per_day = 2;
        s.daily_times = vec!["09:00".parse().unwrap(), "15:00".parse().unwrap()];
        s.inter_reminder_delay = 5;
        s
    }

    fn record(scheduled_for: i64) -> ReminderRecord {
        ReminderRecord::new(
            ID::default(),
            ReminderKind::Rnr,
            Some(ID::default()),
            None,
            scheduled_for,
            scheduled_for,
        )
    }

    #[test]
    fn it_runs_full_campaign() {
        let s = settings();
        let mut r = record(ts(1, 9, 35));

        let mut fires = vec![r.scheduled_for];
        loop {
            let now = r.scheduled_for;
            match r.advance(&s, now) {
                CampaignProgress::Continue { next_at } => {
                    assert!(r.daily_count <= s.reminders_per_day);
                    assert!(r.days_completed < s.total_days);
                    fires.push(next_at);
                }
                CampaignProgress::Exhausted => break,
            }
        }

        assert_eq!(
            fires,
            vec![
                ts(1, 9, 35),
                ts(1, 15, 0),
                ts(2, 9, 0),
                ts(2, 15, 0),
                ts(3, 9, 0),
                ts(3, 15, 0),
            ]
        );
        assert_eq!(r.days_completed, 3);
        assert_eq!(r.daily_count, 2);
    }

    #[test]
    fn it_tracks_daily_count_and_days_completed() {
        let s = settings();
        let mut r = record(ts(1, 9, 35));

        assert_eq!(
            r.advance(&s, ts(1, 9, 35)),
            CampaignProgress::Continue {
                next_at: ts(1, 15, 0)
            }
        );
        assert_eq!((r.daily_count, r.days_completed), (1, 0));

        assert_eq!(
            r.advance(&s, ts(1, 15, 0)),
            CampaignProgress::Continue {
                next_at: ts(2, 9, 0)
            }
        );
        assert_eq!((r.daily_count, r.days_completed), (0, 1));
        assert_eq!(r.status, ReminderStatus::Pending);
    }

    #[test]
    fn late_first_reminder_continues_next_day_without_completing_day() {
        let s = settings();
        let mut r = record(ts(1, 16, 5));

        assert_eq!(
            r.advance(&s, ts(1, 16, 5)),
            CampaignProgress::Continue {
                next_at: ts(2, 9, 0)
            }
        );
        assert_eq!((r.daily_count, r.days_completed), (0, 0));
    }

    #[test]
    fn it_uses_now_when_fired_late() {
        let s = settings();
        let mut r = record(ts(1, 9, 35));

        // Delivered late by the queue, after the afternoon slot already passed
        assert_eq!(
            r.advance(&s, ts(1, 15, 30)),
            CampaignProgress::Continue {
                next_at: ts(2, 9, 0)
            }
        );
    }

    #[test]
    fn it_never_exceeds_quota_when_settings_shrink() {
        let mut s = settings();
        let mut r = record(ts(1, 9, 0));
        r.daily_count = 2;
        r.days_completed = 3;
        r.last_reminder_date = Some(ts(1, 8, 0));

        s.reminders_per_day = 1;
        s.daily_times = vec!["09:00".parse().unwrap()];
        s.total_days = 2;
        assert_eq!(r.advance(&s, ts(1, 9, 0)), CampaignProgress::Exhausted);
        assert_eq!(r.daily_count, 1);
        assert_eq!(r.days_completed, 2);
    }

    #[test]
    fn it_resets_campaign_state() {
        let mut r = record(ts(1, 9, 0));
        r.register_send(ID::default(), ts(1, 9, 0));
        r.reminder_count = 4;
        r.days_completed = 2;
        r.daily_count = 1;
        r.mark_escalated(Some(ID::default()), ts(1, 9, 0));
        r.current_job_id = Some(ID::default());

        let new_owner = ID::default();
        let trigger = ID::default();
        r.reset(
            Some(new_owner.clone()),
            Some(trigger.clone()),
            ts(2, 10, 0),
            ts(2, 9, 0),
        );

        assert_eq!(r.status, ReminderStatus::Pending);
        assert_eq!(r.reminder_count, 0);
        assert_eq!(r.daily_count, 0);
        assert_eq!(r.days_completed, 0);
        assert!(!r.escalated);
        assert_eq!(r.escalated_at, None);
        assert_eq!(r.escalated_to, None);
        assert_eq!(r.owner_id, Some(new_owner));
        assert_eq!(r.trigger_ref, Some(trigger));
        assert_eq!(r.scheduled_for, ts(2, 10, 0));
    }

    #[test]
    fn it_knows_terminal_statuses() {
        assert!(!ReminderStatus::Pending.is_terminal());
        assert!(!ReminderStatus::Sent.is_terminal());
        assert!(ReminderStatus::Completed.is_terminal());
        assert!(ReminderStatus::Cancelled.is_terminal());
        for status in &["pending", "sent", "completed", "cancelled"] {
            assert_eq!(status.parse::<ReminderStatus>().unwrap().as_str(), *status);
        }
    }
}
