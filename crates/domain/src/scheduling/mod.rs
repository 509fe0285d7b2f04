mod round_robin;

pub use round_robin::{
    assign_role_member, RoundRobinAvailabilityAssignment, RoundRobinEqualDistributionAssignment,
};
