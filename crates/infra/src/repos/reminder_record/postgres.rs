use super::IReminderRecordRepo;
use followup_scheduler_domain::{ReminderKind, ReminderRecord, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use std::convert::{TryFrom, TryInto};
use tracing::error;

pub struct PostgresReminderRecordRepo {
    pool: PgPool,
}

impl PostgresReminderRecordRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRecordRaw {
    record_uid: Uuid,
    subject_uid: Uuid,
    kind: String,
    owner_uid: Option<Uuid>,
    status: String,
    scheduled_for: i64,
    sent_at: Option<i64>,
    reminder_count: i32,
    daily_count: i32,
    days_completed: i32,
    last_reminder_date: Option<i64>,
    escalated: bool,
    escalated_at: Option<i64>,
    escalated_to: Option<Uuid>,
    trigger_ref: Option<Uuid>,
    current_job_uid: Option<Uuid>,
    version: i64,
    started: i64,
    created: i64,
    updated: i64,
}

#[derive(Debug, FromRow)]
struct VersionRaw {
    version: i64,
}

impl TryFrom<ReminderRecordRaw> for ReminderRecord {
    type Error = anyhow::Error;

    fn try_from(e: ReminderRecordRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: e.record_uid.into(),
            subject_id: e.subject_uid.into(),
            kind: e.kind.parse()?,
            owner_id: e.owner_uid.map(|id| id.into()),
            status: e.status.parse().map_err(anyhow::Error::msg)?,
            scheduled_for: e.scheduled_for,
            sent_at: e.sent_at,
            reminder_count: e.reminder_count as u32,
            daily_count: e.daily_count as u32,
            days_completed: e.days_completed as u32,
            last_reminder_date: e.last_reminder_date,
            escalated: e.escalated,
            escalated_at: e.escalated_at,
            escalated_to: e.escalated_to.map(|id| id.into()),
            trigger_ref: e.trigger_ref.map(|id| id.into()),
            current_job_id: e.current_job_uid.map(|id| id.into()),
            version: e.version,
            started: e.started,
            created: e.created,
            updated: e.updated,
        })
    }
}

fn into_records(rows: Vec<ReminderRecordRaw>) -> anyhow::Result<Vec<ReminderRecord>> {
    rows.into_iter().map(|row| row.try_into()).collect()
}

const UPDATE_COLUMNS: &str = r#"
    owner_uid = $2,
    status = $3,
    scheduled_for = $4,
    sent_at = $5,
    reminder_count = $6,
    daily_count = $7,
    days_completed = $8,
    last_reminder_date = $9,
    escalated = $10,
    escalated_at = $11,
    escalated_to = $12,
    trigger_ref = $13,
    current_job_uid = $14,
    started = $15,
    updated = $16,
    version = version + 1
"#;

impl PostgresReminderRecordRepo {
    fn bind_update<'q>(
        query: sqlx::query::QueryAs<'q, sqlx::Postgres, VersionRaw, sqlx::postgres::PgArguments>,
        record: &'q ReminderRecord,
    ) -> sqlx::query::QueryAs<'q, sqlx::Postgres, VersionRaw, sqlx::postgres::PgArguments> {
        query
            .bind(record.id.inner_ref())
            .bind(record.owner_id.as_ref().map(|id| id.inner_ref()))
            .bind(record.status.as_str())
            .bind(record.scheduled_for)
            .bind(record.sent_at)
            .bind(record.reminder_count as i32)
            .bind(record.daily_count as i32)
            .bind(record.days_completed as i32)
            .bind(record.last_reminder_date)
            .bind(record.escalated)
            .bind(record.escalated_at)
            .bind(record.escalated_to.as_ref().map(|id| id.inner_ref()))
            .bind(record.trigger_ref.as_ref().map(|id| id.inner_ref()))
            .bind(record.current_job_id.as_ref().map(|id| id.inner_ref()))
            .bind(record.started)
            .bind(record.updated)
    }
}

#[async_trait::async_trait]
impl IReminderRecordRepo for PostgresReminderRecordRepo {
    async fn insert(&self, record: &ReminderRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_records(
                record_uid, subject_uid, kind, owner_uid, status, scheduled_for, sent_at,
                reminder_count, daily_count, days_completed, last_reminder_date,
                escalated, escalated_at, escalated_to, trigger_ref, current_job_uid,
                version, started, created, updated
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(record.id.inner_ref())
        .bind(record.subject_id.inner_ref())
        .bind(record.kind.as_str())
        .bind(record.owner_id.as_ref().map(|id| id.inner_ref()))
        .bind(record.status.as_str())
        .bind(record.scheduled_for)
        .bind(record.sent_at)
        .bind(record.reminder_count as i32)
        .bind(record.daily_count as i32)
        .bind(record.days_completed as i32)
        .bind(record.last_reminder_date)
        .bind(record.escalated)
        .bind(record.escalated_at)
        .bind(record.escalated_to.as_ref().map(|id| id.inner_ref()))
        .bind(record.trigger_ref.as_ref().map(|id| id.inner_ref()))
        .bind(record.current_job_id.as_ref().map(|id| id.inner_ref()))
        .bind(record.version)
        .bind(record.started)
        .bind(record.created)
        .bind(record.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert reminder record: {:?}. DB returned error: {:?}",
                record, e
            );
            e
        })?;

        Ok(())
    }

    async fn save(&self, record: &ReminderRecord) -> anyhow::Result<i64> {
        let sql = format!(
            "UPDATE reminder_records SET {} WHERE record_uid = $1 RETURNING version",
            UPDATE_COLUMNS
        );
        let row = Self::bind_update(sqlx::query_as::<_, VersionRaw>(&sql), record)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Unable to save reminder record: {:?}. DB returned error: {:?}",
                    record, e
                );
                e
            })?;

        Ok(row.version)
    }

    async fn update_if_unchanged(&self, record: &ReminderRecord) -> anyhow::Result<Option<i64>> {
        let sql = format!(
            "UPDATE reminder_records SET {} WHERE record_uid = $1 AND version = $17 RETURNING version",
            UPDATE_COLUMNS
        );
        let row = Self::bind_update(sqlx::query_as::<_, VersionRaw>(&sql), record)
            .bind(record.version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Unable to update reminder record: {:?}. DB returned error: {:?}",
                    record, e
                );
                e
            })?;

        Ok(row.map(|row| row.version))
    }

    async fn find(&self, record_id: &ID) -> anyhow::Result<Option<ReminderRecord>> {
        let row: Option<ReminderRecordRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_records AS r
            WHERE r.record_uid = $1
            "#,
        )
        .bind(record_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_into()).transpose()
    }

    async fn find_non_cancelled(
        &self,
        subject_id: &ID,
        kind: ReminderKind,
    ) -> anyhow::Result<Option<ReminderRecord>> {
        let row: Option<ReminderRecordRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_records AS r
            WHERE r.subject_uid = $1 AND r.kind = $2 AND r.status <> 'cancelled'
            "#,
        )
        .bind(subject_id.inner_ref())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_into()).transpose()
    }

    async fn find_alive_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<ReminderRecord>> {
        let rows: Vec<ReminderRecordRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_records AS r
            WHERE r.owner_uid = $1 AND r.status IN ('pending', 'sent')
            ORDER BY r.scheduled_for
            "#,
        )
        .bind(owner_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }
}
