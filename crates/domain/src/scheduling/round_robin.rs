use crate::{EscalationStrategy, RoleMember, ID};
use rand::{thread_rng, Rng};

/// Picks the member of a role that should take over an escalated subject.
///
/// Members in `excluded` (usually the current owner) are never picked.
/// Ties are broken randomly.
pub fn assign_role_member(
    strategy: EscalationStrategy,
    members: Vec<RoleMember>,
    excluded: &[ID],
) -> Option<ID> {
    let members = members
        .into_iter()
        .filter(|m| !excluded.contains(&m.user_id))
        .collect::<Vec<_>>();
    match strategy {
        EscalationStrategy::LeastRecentlyAssigned => {
            RoundRobinAvailabilityAssignment { members }.assign()
        }
        EscalationStrategy::EqualDistribution => {
            RoundRobinEqualDistributionAssignment { members }.assign()
        }
    }
}

/// Assigns to the member which was least recently assigned a subject.
/// Members that were never assigned anything go first.
pub struct RoundRobinAvailabilityAssignment {
    pub members: Vec<RoleMember>,
}

impl RoundRobinAvailabilityAssignment {
    pub fn assign(self) -> Option<ID> {
        let last_assigned = |m: &RoleMember| m.last_assigned_at.unwrap_or(i64::MIN);
        let oldest = self.members.iter().map(last_assigned).min()?;
        let least_recently_assigned = self
            .members
            .into_iter()
            .filter(|m| last_assigned(m) == oldest)
            .collect::<Vec<_>>();

        pick_random(least_recently_assigned)
    }
}

/// Assigns to the member with the least number of active assignments
pub struct RoundRobinEqualDistributionAssignment {
    pub members: Vec<RoleMember>,
}

impl RoundRobinEqualDistributionAssignment {
    pub fn assign(self) -> Option<ID> {
        let fewest = self.members.iter().map(|m| m.active_assignments).min()?;
        let least_busy = self
            .members
            .into_iter()
            .filter(|m| m.active_assignments == fewest)
            .collect::<Vec<_>>();

        pick_random(least_busy)
    }
}

fn pick_random(mut candidates: Vec<RoleMember>) -> Option<ID> {
    match candidates.len() {
        0 => None,
        1 => Some(candidates.remove(0).user_id),
        len => {
            let mut rng = thread_rng();
            let index = rng.gen_range(0..len);
            Some(candidates.remove(index).user_id)
        }
    }
}
