use crate::{
    campaign::process_reminder_job::{JobOutcome, ProcessReminderJobUseCase, UseCaseError},
    shared::usecase::execute,
};
use actix_web::rt::time::interval;
use followup_scheduler_domain::{retry_backoff_millis, ReminderJob};
use followup_scheduler_infra::FollowupContext;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Polls the delay queue and handles the reminder jobs that are due
pub fn start_reminder_jobs_worker(ctx: FollowupContext) {
    actix_web::rt::spawn(async move {
        let poll_interval = Duration::from_millis(ctx.config.reminder_jobs_poll_interval_millis);
        let mut interval = interval(poll_interval);
        loop {
            interval.tick().await;
            run_due_reminder_jobs(&ctx).await;
        }
    });
}

/// Claims a batch of due jobs and handles them concurrently.
/// Returns the number of claimed jobs.
pub async fn run_due_reminder_jobs(ctx: &FollowupContext) -> usize {
    let now = ctx.sys.get_timestamp_millis();
    let jobs = match ctx
        .repos
        .reminder_job_repo
        .claim_due(
            now,
            ctx.config.reminder_jobs_lease_millis,
            ctx.config.reminder_jobs_batch_size,
        )
        .await
    {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("Unable to claim due reminder jobs. Error: {:?}", e);
            return 0;
        }
    };

    let count = jobs.len();
    if count > 0 {
        debug!("Claimed {} due reminder jobs", count);
    }
    join_all(jobs.into_iter().map(|job| handle_job(job, ctx))).await;
    count
}

async fn handle_job(job: ReminderJob, ctx: &FollowupContext) {
    let usecase = ProcessReminderJobUseCase::new(job.clone());
    match execute(usecase, ctx).await {
        Ok(outcome) => {
            if outcome == JobOutcome::Superseded {
                debug!("Job: {} was superseded", job.id);
            }
            if let Err(e) = ctx.repos.reminder_job_repo.complete(&job.id).await {
                // The lease runs out and the job is handled again
                warn!("Unable to complete job: {}. Error: {:?}", job.id, e);
            }
        }
        Err(e) => fail_job(job, e, ctx).await,
    }
}

async fn fail_job(job: ReminderJob, e: UseCaseError, ctx: &FollowupContext) {
    let now = ctx.sys.get_timestamp_millis();
    let attempts = job.attempts + 1;
    let reason = format!("{:?}", e);

    let res = if attempts >= ctx.config.reminder_jobs_max_attempts {
        error!(
            "Reminder job: {} of record: {} failed {} times and is moved to the dead letters. Error: {}",
            job.id, job.record_id, attempts, reason
        );
        let mut job = job;
        job.attempts = attempts;
        ctx.repos
            .reminder_job_repo
            .dead_letter(&job, &reason, now)
            .await
    } else {
        let run_at = now + retry_backoff_millis(ctx.config.reminder_jobs_retry_base_millis, attempts);
        warn!(
            "Reminder job: {} failed, retrying at: {}. Error: {}",
            job.id, run_at, reason
        );
        ctx.repos
            .reminder_job_repo
            .retry(&job.id, run_at, attempts, &reason)
            .await
    };

    if let Err(e) = res {
        error!("Unable to reschedule failed job. Error: {:?}", e);
    }
}
