mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderJobRepo;
pub use postgres::PostgresReminderJobRepo;

use crate::repos::shared::repo::DeleteResult;
use followup_scheduler_domain::{DeadReminderJob, ReminderJob, ReminderKind, ID};

/// Durable delay queue of `ReminderJob`s.
///
/// Delivery is at least once: a claimed job is leased to the worker and
/// becomes due again when the lease runs out before the job was completed.
#[async_trait::async_trait]
pub trait IReminderJobRepo: Send + Sync {
    /// Adds the job unless a job with the same id is queued already
    async fn enqueue(&self, job: &ReminderJob) -> anyhow::Result<()>;
    /// Leases up to `limit` due jobs, the earliest first
    async fn claim_due(
        &self,
        now: i64,
        lease_millis: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<ReminderJob>>;
    /// Removes a job that was handled
    async fn complete(&self, job_id: &ID) -> anyhow::Result<()>;
    /// Releases the lease and makes the job due again at `run_at`
    async fn retry(
        &self,
        job_id: &ID,
        run_at: i64,
        attempts: i32,
        error: &str,
    ) -> anyhow::Result<()>;
    /// Moves a job that can not be handled to the dead letters
    async fn dead_letter(&self, job: &ReminderJob, error: &str, now: i64) -> anyhow::Result<()>;
    async fn delete(&self, job_id: &ID) -> anyhow::Result<Option<ReminderJob>>;
    async fn delete_by_record(&self, record_id: &ID) -> anyhow::Result<DeleteResult>;
    async fn delete_by_subject(
        &self,
        subject_id: &ID,
        kind: Option<ReminderKind>,
    ) -> anyhow::Result<DeleteResult>;
    async fn find(&self, job_id: &ID) -> anyhow::Result<Option<ReminderJob>>;
    async fn find_by_record(&self, record_id: &ID) -> anyhow::Result<Vec<ReminderJob>>;
    async fn find_dead_letters(&self) -> anyhow::Result<Vec<DeadReminderJob>>;
}

#[cfg(test)]
mod tests {
    use crate::FollowupContext;
    use followup_scheduler_domain::{ReminderJob, ReminderKind, ID};

    fn job(subject_id: &ID, kind: ReminderKind, run_at: i64) -> ReminderJob {
        ReminderJob::new(ID::default(), subject_id.clone(), kind, None, 1, run_at)
    }

    #[tokio::test]
    async fn it_claims_due_jobs_with_a_lease() {
        let ctx = FollowupContext::create_inmemory();
        let repo = &ctx.repos.reminder_job_repo;
        let subject = ID::default();
        let late = job(&subject, ReminderKind::Rnr, 200);
        let early = job(&subject, ReminderKind::ProcessingStep, 100);
        let future = job(&subject, ReminderKind::DocumentStep, 1000);
        for j in &[&late, &early, &future] {
            repo.enqueue(j).await.unwrap();
        }
        // Enqueueing twice keeps a single job
        repo.enqueue(&late).await.unwrap();

        let claimed = repo.claim_due(500, 60, 10).await.unwrap();
        assert_eq!(
            claimed.iter().map(|j| j.id.clone()).collect::<Vec<_>>(),
            vec![early.id.clone(), late.id.clone()]
        );
        assert!(claimed.iter().all(|j| j.locked_until == Some(560)));

        // Leased jobs are invisible until the lease runs out
        assert!(repo.claim_due(520, 60, 10).await.unwrap().is_empty());
        assert_eq!(repo.claim_due(560, 60, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn it_completes_retries_and_dead_letters() {
        let ctx = FollowupContext::create_inmemory();
        let repo = &ctx.repos.reminder_job_repo;
        let first = job(&ID::default(), ReminderKind::Rnr, 0);
        let second = job(&ID::default(), ReminderKind::Rnr, 0);
        repo.enqueue(&first).await.unwrap();
        repo.enqueue(&second).await.unwrap();
        assert_eq!(repo.claim_due(10, 100, 10).await.unwrap().len(), 2);

        repo.complete(&first.id).await.unwrap();
        assert!(repo.find(&first.id).await.unwrap().is_none());

        repo.retry(&second.id, 50, 1, "store down").await.unwrap();
        let retried = repo.find(&second.id).await.unwrap().unwrap();
        assert_eq!(retried.attempts, 1);
        assert_eq!(retried.run_at, 50);
        assert_eq!(retried.locked_until, None);
        assert_eq!(retried.last_error, Some("store down".to_string()));
        assert!(repo.claim_due(49, 100, 10).await.unwrap().is_empty());
        assert_eq!(repo.claim_due(50, 100, 10).await.unwrap().len(), 1);

        repo.dead_letter(&retried, "store down", 60).await.unwrap();
        assert!(repo.find(&second.id).await.unwrap().is_none());
        let dead = repo.find_dead_letters().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].job.id, second.id);
        assert_eq!(dead[0].error, "store down");
        assert_eq!(dead[0].dead_at, 60);
    }

    #[tokio::test]
    async fn it_deletes_by_filter() {
        let ctx = FollowupContext::create_inmemory();
        let repo = &ctx.repos.reminder_job_repo;
        let subject = ID::default();
        let rnr = job(&subject, ReminderKind::Rnr, 0);
        let step = job(&subject, ReminderKind::ProcessingStep, 0);
        let other = job(&ID::default(), ReminderKind::Rnr, 0);
        for j in &[&rnr, &step, &other] {
            repo.enqueue(j).await.unwrap();
        }

        assert_eq!(repo.find_by_record(&rnr.record_id).await.unwrap(), vec![rnr.clone()]);
        let res = repo
            .delete_by_subject(&subject, Some(ReminderKind::Rnr))
            .await
            .unwrap();
        assert_eq!(res.deleted_count, 1);
        let res = repo.delete_by_subject(&subject, None).await.unwrap();
        assert_eq!(res.deleted_count, 1);
        let res = repo.delete_by_record(&other.record_id).await.unwrap();
        assert_eq!(res.deleted_count, 1);
        // Deleting what is gone is not an error
        assert!(repo.delete(&other.id).await.unwrap().is_none());
    }
}
