use super::ICandidateRepo;
use crate::repos::shared::inmemory_repo::*;
use followup_scheduler_domain::{Candidate, CandidateAssignment, RoleMember, ID};
use std::sync::Mutex;

pub struct InMemoryCandidateRepo {
    candidates: Mutex<Vec<Candidate>>,
    assignments: Mutex<Vec<CandidateAssignment>>,
    role_members: Mutex<Vec<(ID, String)>>,
}

impl InMemoryCandidateRepo {
    pub fn new() -> Self {
        Self {
            candidates: Mutex::new(Vec::new()),
            assignments: Mutex::new(Vec::new()),
            role_members: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ICandidateRepo for InMemoryCandidateRepo {
    async fn insert(&self, candidate: &Candidate) -> anyhow::Result<()> {
        insert(candidate, &self.candidates);
        Ok(())
    }

    async fn save(&self, candidate: &Candidate) -> anyhow::Result<()> {
        save(candidate, &self.candidates);
        Ok(())
    }

    async fn find(&self, candidate_id: &ID) -> anyhow::Result<Option<Candidate>> {
        Ok(find(candidate_id, &self.candidates))
    }

    async fn find_active_assignment(
        &self,
        candidate_id: &ID,
        role: &str,
    ) -> anyhow::Result<Option<CandidateAssignment>> {
        Ok(find_by(&self.assignments, |a| {
            a.candidate_id == *candidate_id && a.role == role && a.active
        })
        .into_iter()
        .next())
    }

    async fn assign(&self, assignment: &CandidateAssignment) -> anyhow::Result<()> {
        update_many(
            &self.assignments,
            |a| a.candidate_id == assignment.candidate_id && a.role == assignment.role,
            |a| a.active = false,
        );
        insert(assignment, &self.assignments);
        update_many(
            &self.candidates,
            |c| c.id == assignment.candidate_id,
            |c| c.owner_id = Some(assignment.user_id.clone()),
        );
        Ok(())
    }

    async fn add_role_member(&self, user_id: &ID, role: &str) -> anyhow::Result<()> {
        let mut members = self.role_members.lock().unwrap();
        if !members.iter().any(|(id, r)| id == user_id && r == role) {
            members.push((user_id.clone(), role.to_string()));
        }
        Ok(())
    }

    async fn find_role_members(&self, role: &str) -> anyhow::Result<Vec<RoleMember>> {
        let user_ids = find_by(&self.role_members, |(_, r)| r == role);
        let assignments = find_by(&self.assignments, |a| a.role == role);

        Ok(user_ids
            .into_iter()
            .map(|(user_id, _)| {
                let own = assignments
                    .iter()
                    .filter(|a| a.user_id == user_id)
                    .collect::<Vec<_>>();
                RoleMember {
                    last_assigned_at: own.iter().map(|a| a.assigned_at).max(),
                    active_assignments: own.iter().filter(|a| a.active).count(),
                    user_id,
                }
            })
            .collect())
    }
}
