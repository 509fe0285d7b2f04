use crate::ReminderKind;
use chrono::{NaiveTime, Timelike};
use chrono_tz::{Tz, UTC};
use itertools::Itertools;
use serde::{de::Visitor, Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// A wall clock time of day with minute precision, written as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

#[derive(Error, Debug, PartialEq)]
#[error("Time of day: `{0}` is not in the HH:MM format")]
pub struct InvalidTimeOfDayError(pub String);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn naive(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| InvalidTimeOfDayError(s.to_string()))
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct TimeOfDayVisitor;

        impl<'de> Visitor<'de> for TimeOfDayVisitor {
            type Value = TimeOfDay;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("A time of day in the HH:MM format")
            }

            fn visit_str<E>(self, value: &str) -> Result<TimeOfDay, E>
            where
                E: serde::de::Error,
            {
                value.parse::<TimeOfDay>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TimeOfDayVisitor)
    }
}

/// Daily window in which reminders are allowed to fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeHours {
    pub enabled: bool,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Default for OfficeHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: TimeOfDay(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()),
            end: TimeOfDay(NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()),
        }
    }
}

/// How the member that receives an escalated subject is selected
/// among the members of the escalation role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EscalationStrategy {
    /// Assign to the member that was least recently assigned a subject
    LeastRecentlyAssigned,
    /// Assign to the member with the fewest active assignments
    EqualDistribution,
}

impl Default for EscalationStrategy {
    fn default() -> Self {
        Self::LeastRecentlyAssigned
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EscalationSettings {
    pub enabled: bool,
    /// Days to wait after the campaign is exhausted before escalating.
    /// Zero escalates right away when the last reminder has fired.
    pub after_days: u32,
    #[serde(default)]
    pub strategy: EscalationStrategy,
}

/// Configuration of a reminder campaign for one `ReminderKind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettings {
    pub total_days: u32,
    pub reminders_per_day: u32,
    #[serde(default)]
    pub daily_times: Vec<TimeOfDay>,
    /// Minutes between the trigger and the first reminder
    pub inter_reminder_delay: i64,
    #[serde(default)]
    pub office_hours: OfficeHours,
    #[serde(default)]
    pub escalation: EscalationSettings,
    /// Timezone used for `daily_times`, `office_hours` and for
    /// deciding what a calendar day is
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

/// One year
pub const MAX_INTER_REMINDER_DELAY_MINUTES: i64 = 60 * 24 * 365;
pub const MAX_ESCALATION_AFTER_DAYS: u32 = 365;

const MILLIS_PER_MINUTE: i64 = 1000 * 60;
const MILLIS_PER_DAY: i64 = MILLIS_PER_MINUTE * 60 * 24;

fn default_timezone() -> Tz {
    UTC
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidSettingsError {
    #[error("totalDays must be greater than zero")]
    TotalDays,
    #[error("remindersPerDay must be greater than zero")]
    RemindersPerDay,
    #[error("Expected {expected} dailyTimes, but got {actual}")]
    DailyTimes { expected: u32, actual: usize },
    #[error("interReminderDelay can not be negative")]
    NegativeDelay,
    #[error("interReminderDelay can not be more than {max} minutes")]
    DelayTooLarge { max: i64 },
    #[error("escalation.afterDays can not be more than {max}")]
    EscalationDelayTooLarge { max: u32 },
    #[error("Office hours must start before they end")]
    OfficeHours,
}

impl ReminderSettings {
    /// Settings used when nothing has been stored for a kind
    pub fn default_for(kind: ReminderKind) -> Self {
        let time = |h: u32| TimeOfDay::new(h, 0).into_iter().collect::<Vec<_>>();
        match kind {
            ReminderKind::Rnr => Self {
                total_days: 3,
                reminders_per_day: 2,
                daily_times: [time(10), time(16)].concat(),
                inter_reminder_delay: 30,
                office_hours: Default::default(),
                escalation: EscalationSettings {
                    enabled: true,
                    after_days: 0,
                    strategy: EscalationStrategy::LeastRecentlyAssigned,
                },
                timezone: UTC,
            },
            ReminderKind::ProcessingStep | ReminderKind::DocumentStep => Self {
                total_days: 3,
                reminders_per_day: 1,
                daily_times: time(10),
                inter_reminder_delay: 60,
                office_hours: Default::default(),
                escalation: Default::default(),
                timezone: UTC,
            },
        }
    }

    pub fn validate(&self) -> Result<(), InvalidSettingsError> {
        if self.total_days == 0 {
            return Err(InvalidSettingsError::TotalDays);
        }
        if self.reminders_per_day == 0 {
            return Err(InvalidSettingsError::RemindersPerDay);
        }
        if !self.daily_times.is_empty() && self.daily_times.len() != self.reminders_per_day as usize
        {
            return Err(InvalidSettingsError::DailyTimes {
                expected: self.reminders_per_day,
                actual: self.daily_times.len(),
            });
        }
        if self.inter_reminder_delay < 0 {
            return Err(InvalidSettingsError::NegativeDelay);
        }
        if self.inter_reminder_delay > MAX_INTER_REMINDER_DELAY_MINUTES {
            return Err(InvalidSettingsError::DelayTooLarge {
                max: MAX_INTER_REMINDER_DELAY_MINUTES,
            });
        }
        if self.escalation.after_days > MAX_ESCALATION_AFTER_DAYS {
            return Err(InvalidSettingsError::EscalationDelayTooLarge {
                max: MAX_ESCALATION_AFTER_DAYS,
            });
        }
        if self.office_hours.enabled && self.office_hours.start >= self.office_hours.end {
            return Err(InvalidSettingsError::OfficeHours);
        }
        Ok(())
    }

    /// The slots at which reminders fire on any given day, in ascending order.
    ///
    /// Falls back to `09:00` when no daily times are configured. With office hours
    /// enabled, slots before the start are moved to the start and slots after the
    /// end are dropped.
    pub fn daily_slots(&self) -> Vec<TimeOfDay> {
        let fallback = TimeOfDay(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default());
        let times = if self.daily_times.is_empty() {
            vec![fallback]
        } else {
            self.daily_times.clone()
        };

        if !self.office_hours.enabled {
            return times.into_iter().sorted().dedup().collect();
        }

        let OfficeHours { start, end, .. } = self.office_hours;
        let slots = times
            .into_iter()
            .filter(|t| *t <= end)
            .map(|t| if t < start { start } else { t })
            .sorted()
            .dedup()
            .collect::<Vec<_>>();
        if slots.is_empty() {
            vec![start]
        } else {
            slots
        }
    }

    /// Number of reminders that can actually fire on a single day
    pub fn daily_quota(&self) -> u32 {
        std::cmp::min(self.reminders_per_day, self.daily_slots().len() as u32)
    }

    /// Stored settings are validated, but settings can also be built in code,
    /// so the conversions saturate instead of overflowing.
    pub fn inter_reminder_delay_millis(&self) -> i64 {
        self.inter_reminder_delay
            .max(0)
            .saturating_mul(MILLIS_PER_MINUTE)
    }

    pub fn escalation_delay_millis(&self) -> i64 {
        i64::from(self.escalation.after_days).saturating_mul(MILLIS_PER_DAY)
    }
}
