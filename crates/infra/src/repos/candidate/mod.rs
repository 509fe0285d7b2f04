mod inmemory;
mod postgres;

pub use inmemory::InMemoryCandidateRepo;
pub use postgres::PostgresCandidateRepo;

use followup_scheduler_domain::{Candidate, CandidateAssignment, RoleMember, ID};

/// View on the candidates of the staffing application and on who is
/// responsible for them
#[async_trait::async_trait]
pub trait ICandidateRepo: Send + Sync {
    async fn insert(&self, candidate: &Candidate) -> anyhow::Result<()>;
    async fn save(&self, candidate: &Candidate) -> anyhow::Result<()>;
    async fn find(&self, candidate_id: &ID) -> anyhow::Result<Option<Candidate>>;
    async fn find_active_assignment(
        &self,
        candidate_id: &ID,
        role: &str,
    ) -> anyhow::Result<Option<CandidateAssignment>>;
    /// Stores the assignment as the only active one of its role for the candidate
    /// and makes the assigned user the owner of the candidate
    async fn assign(&self, assignment: &CandidateAssignment) -> anyhow::Result<()>;
    async fn add_role_member(&self, user_id: &ID, role: &str) -> anyhow::Result<()>;
    async fn find_role_members(&self, role: &str) -> anyhow::Result<Vec<RoleMember>>;
}
