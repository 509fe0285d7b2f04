use super::IProcessingStepRepo;
use crate::repos::shared::inmemory_repo::*;
use followup_scheduler_domain::{ProcessingStep, ID};
use std::sync::Mutex;

pub struct InMemoryProcessingStepRepo {
    steps: Mutex<Vec<ProcessingStep>>,
}

impl InMemoryProcessingStepRepo {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IProcessingStepRepo for InMemoryProcessingStepRepo {
    async fn insert(&self, step: &ProcessingStep) -> anyhow::Result<()> {
        insert(step, &self.steps);
        Ok(())
    }

    async fn save(&self, step: &ProcessingStep) -> anyhow::Result<()> {
        save(step, &self.steps);
        Ok(())
    }

    async fn find(&self, step_id: &ID) -> anyhow::Result<Option<ProcessingStep>> {
        Ok(find(step_id, &self.steps))
    }
}
