use super::IReminderJobRepo;
use crate::repos::shared::{inmemory_repo::*, repo::DeleteResult};
use followup_scheduler_domain::{DeadReminderJob, ReminderJob, ReminderKind, ID};
use std::sync::Mutex;

pub struct InMemoryReminderJobRepo {
    jobs: Mutex<Vec<ReminderJob>>,
    dead_jobs: Mutex<Vec<DeadReminderJob>>,
}

impl InMemoryReminderJobRepo {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            dead_jobs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderJobRepo for InMemoryReminderJobRepo {
    async fn enqueue(&self, job: &ReminderJob) -> anyhow::Result<()> {
        if find(&job.id, &self.jobs).is_none() {
            insert(job, &self.jobs);
        }
        Ok(())
    }

    async fn claim_due(
        &self,
        now: i64,
        lease_millis: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<ReminderJob>> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut due = jobs
            .iter_mut()
            .filter(|job| job.is_due(now))
            .collect::<Vec<_>>();
        due.sort_by_key(|job| job.run_at);

        Ok(due
            .into_iter()
            .take(limit)
            .map(|job| {
                job.locked_until = Some(now + lease_millis);
                job.clone()
            })
            .collect())
    }

    async fn complete(&self, job_id: &ID) -> anyhow::Result<()> {
        delete(job_id, &self.jobs);
        Ok(())
    }

    async fn retry(
        &self,
        job_id: &ID,
        run_at: i64,
        attempts: i32,
        error: &str,
    ) -> anyhow::Result<()> {
        update_many(
            &self.jobs,
            |job| job.id == *job_id,
            |job| {
                job.run_at = run_at;
                job.attempts = attempts;
                job.locked_until = None;
                job.last_error = Some(error.to_string());
            },
        );
        Ok(())
    }

    async fn dead_letter(&self, job: &ReminderJob, error: &str, now: i64) -> anyhow::Result<()> {
        delete(&job.id, &self.jobs);
        insert(
            &DeadReminderJob {
                job: job.clone(),
                error: error.to_string(),
                dead_at: now,
            },
            &self.dead_jobs,
        );
        Ok(())
    }

    async fn delete(&self, job_id: &ID) -> anyhow::Result<Option<ReminderJob>> {
        Ok(delete(job_id, &self.jobs))
    }

    async fn delete_by_record(&self, record_id: &ID) -> anyhow::Result<DeleteResult> {
        Ok(delete_by(&self.jobs, |job| job.record_id == *record_id))
    }

    async fn delete_by_subject(
        &self,
        subject_id: &ID,
        kind: Option<ReminderKind>,
    ) -> anyhow::Result<DeleteResult> {
        Ok(delete_by(&self.jobs, |job| {
            job.subject_id == *subject_id && kind.map(|kind| job.kind == kind).unwrap_or(true)
        }))
    }

    async fn find(&self, job_id: &ID) -> anyhow::Result<Option<ReminderJob>> {
        Ok(find(job_id, &self.jobs))
    }

    async fn find_by_record(&self, record_id: &ID) -> anyhow::Result<Vec<ReminderJob>> {
        Ok(find_by(&self.jobs, |job| job.record_id == *record_id))
    }

    async fn find_dead_letters(&self) -> anyhow::Result<Vec<DeadReminderJob>> {
        Ok(find_by(&self.dead_jobs, |_| true))
    }
}
