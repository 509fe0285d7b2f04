//! Read and write views on the entities owned by the surrounding
//! staffing application that reminder campaigns are about.

use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};

/// Candidate status meaning "ringing, no response": the candidate did not
/// pick up and is waiting for a call back
pub const RNR_STATUS: &str = "rnr";

/// Role that takes over candidates whose RNR campaign ran out
pub const RNR_ESCALATION_ROLE: &str = "escalation_caller";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: ID,
    pub name: String,
    pub status: String,
    pub owner_id: Option<ID>,
}

impl Candidate {
    pub fn is_awaiting_response(&self) -> bool {
        self.status == RNR_STATUS
    }
}

impl Entity for Candidate {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// A user responsible for a candidate in a given role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAssignment {
    pub id: ID,
    pub candidate_id: ID,
    pub user_id: ID,
    pub role: String,
    pub active: bool,
    pub assigned_at: i64,
}

impl CandidateAssignment {
    pub fn new(candidate_id: ID, user_id: ID, role: &str, now: i64) -> Self {
        Self {
            id: Default::default(),
            candidate_id,
            user_id,
            role: role.to_string(),
            active: true,
            assigned_at: now,
        }
    }
}

impl Entity for CandidateAssignment {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// A user that can be assigned candidates in a role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleMember {
    pub user_id: ID,
    /// When the member was assigned a candidate in this role the last time
    pub last_assigned_at: Option<i64>,
    /// Number of active assignments the member has in this role
    pub active_assignments: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Open,
    Completed,
    Cancelled,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Open,
        }
    }
}

/// A step in the candidate pipeline, e.g. a screening or a document that
/// has to be verified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStep {
    pub id: ID,
    pub candidate_id: ID,
    pub title: String,
    pub status: StepStatus,
    pub submitted_at: Option<i64>,
    pub owner_id: Option<ID>,
}

impl ProcessingStep {
    /// A step needs follow up when it was submitted but nobody finished it yet
    pub fn awaits_completion(&self) -> bool {
        self.status == StepStatus::Open && self.submitted_at.is_some()
    }
}

impl Entity for ProcessingStep {
    fn id(&self) -> &ID {
        &self.id
    }
}
