mod inmemory;
mod postgres;

pub use inmemory::InMemoryProcessingStepRepo;
pub use postgres::PostgresProcessingStepRepo;

use followup_scheduler_domain::{ProcessingStep, ID};

/// View on the processing and document steps of the candidate pipeline
#[async_trait::async_trait]
pub trait IProcessingStepRepo: Send + Sync {
    async fn insert(&self, step: &ProcessingStep) -> anyhow::Result<()>;
    async fn save(&self, step: &ProcessingStep) -> anyhow::Result<()>;
    async fn find(&self, step_id: &ID) -> anyhow::Result<Option<ProcessingStep>>;
}
