use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Tags which trigger condition and escalation action a reminder campaign uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    /// A candidate was marked as "ringing, no response" and has to be called back.
    /// Escalates to another responsible role when the campaign runs out.
    Rnr,
    /// A submitted processing step is waiting to be completed
    ProcessingStep,
    /// A submitted document step is waiting to be verified
    DocumentStep,
}

impl ReminderKind {
    pub fn all() -> [ReminderKind; 3] {
        [Self::Rnr, Self::ProcessingStep, Self::DocumentStep]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rnr => "rnr",
            Self::ProcessingStep => "processing_step",
            Self::DocumentStep => "document_step",
        }
    }
}

impl Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Reminder kind: {0} is not known")]
pub struct InvalidReminderKindError(pub String);

impl FromStr for ReminderKind {
    type Err = InvalidReminderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rnr" => Ok(Self::Rnr),
            "processing_step" | "processingStep" => Ok(Self::ProcessingStep),
            "document_step" | "documentStep" => Ok(Self::DocumentStep),
            _ => Err(InvalidReminderKindError(s.to_string())),
        }
    }
}
