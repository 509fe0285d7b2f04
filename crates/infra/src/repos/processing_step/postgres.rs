use super::IProcessingStepRepo;
use followup_scheduler_domain::{ProcessingStep, StepStatus, ID};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresProcessingStepRepo {
    pool: PgPool,
}

impl PostgresProcessingStepRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProcessingStepRaw {
    step_uid: Uuid,
    candidate_uid: Uuid,
    title: String,
    status: String,
    submitted_at: Option<i64>,
    owner_uid: Option<Uuid>,
}

impl From<ProcessingStepRaw> for ProcessingStep {
    fn from(e: ProcessingStepRaw) -> Self {
        Self {
            id: e.step_uid.into(),
            candidate_id: e.candidate_uid.into(),
            title: e.title,
            status: StepStatus::from_str_lossy(&e.status),
            submitted_at: e.submitted_at,
            owner_id: e.owner_uid.map(|id| id.into()),
        }
    }
}

#[async_trait::async_trait]
impl IProcessingStepRepo for PostgresProcessingStepRepo {
    async fn insert(&self, step: &ProcessingStep) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processing_steps(step_uid, candidate_uid, title, status, submitted_at, owner_uid)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(step.id.inner_ref())
        .bind(step.candidate_id.inner_ref())
        .bind(&step.title)
        .bind(step.status.as_str())
        .bind(step.submitted_at)
        .bind(step.owner_id.as_ref().map(|id| id.inner_ref()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, step: &ProcessingStep) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE processing_steps SET
                title = $2,
                status = $3,
                submitted_at = $4,
                owner_uid = $5
            WHERE step_uid = $1
            "#,
        )
        .bind(step.id.inner_ref())
        .bind(&step.title)
        .bind(step.status.as_str())
        .bind(step.submitted_at)
        .bind(step.owner_id.as_ref().map(|id| id.inner_ref()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, step_id: &ID) -> anyhow::Result<Option<ProcessingStep>> {
        let row: Option<ProcessingStepRaw> =
            sqlx::query_as("SELECT * FROM processing_steps AS s WHERE s.step_uid = $1")
                .bind(step_id.inner_ref())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|row| row.into()))
    }
}
