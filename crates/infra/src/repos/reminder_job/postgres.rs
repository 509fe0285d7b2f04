use super::IReminderJobRepo;
use crate::repos::shared::repo::DeleteResult;
use followup_scheduler_domain::{DeadReminderJob, ReminderJob, ReminderKind, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use std::convert::{TryFrom, TryInto};
use tracing::error;

pub struct PostgresReminderJobRepo {
    pool: PgPool,
}

impl PostgresReminderJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderJobRaw {
    job_uid: Uuid,
    record_uid: Uuid,
    subject_uid: Uuid,
    kind: String,
    owner_uid: Option<Uuid>,
    sequence_number: i64,
    run_at: i64,
    attempts: i32,
    locked_until: Option<i64>,
    last_error: Option<String>,
}

#[derive(Debug, FromRow)]
struct DeadReminderJobRaw {
    #[sqlx(flatten)]
    job: ReminderJobRaw,
    error: String,
    dead_at: i64,
}

impl TryFrom<ReminderJobRaw> for ReminderJob {
    type Error = anyhow::Error;

    fn try_from(e: ReminderJobRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: e.job_uid.into(),
            record_id: e.record_uid.into(),
            subject_id: e.subject_uid.into(),
            kind: e.kind.parse()?,
            owner_id: e.owner_uid.map(|id| id.into()),
            sequence_number: e.sequence_number,
            run_at: e.run_at,
            attempts: e.attempts,
            locked_until: e.locked_until,
            last_error: e.last_error,
        })
    }
}

impl TryFrom<DeadReminderJobRaw> for DeadReminderJob {
    type Error = anyhow::Error;

    fn try_from(e: DeadReminderJobRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            job: e.job.try_into()?,
            error: e.error,
            dead_at: e.dead_at,
        })
    }
}

fn into_jobs(rows: Vec<ReminderJobRaw>) -> anyhow::Result<Vec<ReminderJob>> {
    rows.into_iter().map(|row| row.try_into()).collect()
}

#[async_trait::async_trait]
impl IReminderJobRepo for PostgresReminderJobRepo {
    async fn enqueue(&self, job: &ReminderJob) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_jobs(
                job_uid, record_uid, subject_uid, kind, owner_uid,
                sequence_number, run_at, attempts, locked_until, last_error
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (job_uid) DO NOTHING
            "#,
        )
        .bind(job.id.inner_ref())
        .bind(job.record_id.inner_ref())
        .bind(job.subject_id.inner_ref())
        .bind(job.kind.as_str())
        .bind(job.owner_id.as_ref().map(|id| id.inner_ref()))
        .bind(job.sequence_number)
        .bind(job.run_at)
        .bind(job.attempts)
        .bind(job.locked_until)
        .bind(job.last_error.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to enqueue reminder job: {:?}. DB returned error: {:?}",
                job, e
            );
            e
        })?;

        Ok(())
    }

    async fn claim_due(
        &self,
        now: i64,
        lease_millis: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<ReminderJob>> {
        let rows: Vec<ReminderJobRaw> = sqlx::query_as(
            r#"
            UPDATE reminder_jobs SET locked_until = $2
            WHERE job_uid IN (
                SELECT j.job_uid FROM reminder_jobs AS j
                WHERE j.run_at <= $1
                AND (j.locked_until IS NULL OR j.locked_until <= $1)
                ORDER BY j.run_at
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now + lease_millis)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut jobs = into_jobs(rows)?;
        jobs.sort_by_key(|job| job.run_at);
        Ok(jobs)
    }

    async fn complete(&self, job_id: &ID) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM reminder_jobs WHERE job_uid = $1")
            .bind(job_id.inner_ref())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn retry(
        &self,
        job_id: &ID,
        run_at: i64,
        attempts: i32,
        error: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reminder_jobs SET
                run_at = $2,
                attempts = $3,
                last_error = $4,
                locked_until = NULL
            WHERE job_uid = $1
            "#,
        )
        .bind(job_id.inner_ref())
        .bind(run_at)
        .bind(attempts)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn dead_letter(&self, job: &ReminderJob, error: &str, now: i64) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM reminder_jobs WHERE job_uid = $1")
            .bind(job.id.inner_ref())
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO reminder_dead_jobs(
                job_uid, record_uid, subject_uid, kind, owner_uid,
                sequence_number, run_at, attempts, locked_until, last_error,
                error, dead_at
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, NULL, $9, $10, $11)
            "#,
        )
        .bind(job.id.inner_ref())
        .bind(job.record_id.inner_ref())
        .bind(job.subject_id.inner_ref())
        .bind(job.kind.as_str())
        .bind(job.owner_id.as_ref().map(|id| id.inner_ref()))
        .bind(job.sequence_number)
        .bind(job.run_at)
        .bind(job.attempts)
        .bind(job.last_error.as_deref())
        .bind(error)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, job_id: &ID) -> anyhow::Result<Option<ReminderJob>> {
        let row: Option<ReminderJobRaw> = sqlx::query_as(
            r#"
            DELETE FROM reminder_jobs AS j
            WHERE j.job_uid = $1
            RETURNING *
            "#,
        )
        .bind(job_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_into()).transpose()
    }

    async fn delete_by_record(&self, record_id: &ID) -> anyhow::Result<DeleteResult> {
        let res = sqlx::query("DELETE FROM reminder_jobs WHERE record_uid = $1")
            .bind(record_id.inner_ref())
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult {
            deleted_count: res.rows_affected() as i64,
        })
    }

    async fn delete_by_subject(
        &self,
        subject_id: &ID,
        kind: Option<ReminderKind>,
    ) -> anyhow::Result<DeleteResult> {
        let res = sqlx::query(
            r#"
            DELETE FROM reminder_jobs
            WHERE subject_uid = $1 AND ($2::text IS NULL OR kind = $2)
            "#,
        )
        .bind(subject_id.inner_ref())
        .bind(kind.map(|kind| kind.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(DeleteResult {
            deleted_count: res.rows_affected() as i64,
        })
    }

    async fn find(&self, job_id: &ID) -> anyhow::Result<Option<ReminderJob>> {
        let row: Option<ReminderJobRaw> =
            sqlx::query_as("SELECT * FROM reminder_jobs AS j WHERE j.job_uid = $1")
                .bind(job_id.inner_ref())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|row| row.try_into()).transpose()
    }

    async fn find_by_record(&self, record_id: &ID) -> anyhow::Result<Vec<ReminderJob>> {
        let rows: Vec<ReminderJobRaw> = sqlx::query_as(
            "SELECT * FROM reminder_jobs AS j WHERE j.record_uid = $1 ORDER BY j.run_at",
        )
        .bind(record_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        into_jobs(rows)
    }

    async fn find_dead_letters(&self) -> anyhow::Result<Vec<DeadReminderJob>> {
        let rows: Vec<DeadReminderJobRaw> =
            sqlx::query_as("SELECT * FROM reminder_dead_jobs AS d ORDER BY d.dead_at")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }
}
