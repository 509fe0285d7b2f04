use super::ICandidateRepo;
use followup_scheduler_domain::{Candidate, CandidateAssignment, RoleMember, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresCandidateRepo {
    pool: PgPool,
}

impl PostgresCandidateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CandidateRaw {
    candidate_uid: Uuid,
    name: String,
    status: String,
    owner_uid: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct CandidateAssignmentRaw {
    assignment_uid: Uuid,
    candidate_uid: Uuid,
    user_uid: Uuid,
    role: String,
    active: bool,
    assigned_at: i64,
}

#[derive(Debug, FromRow)]
struct RoleMemberRaw {
    user_uid: Uuid,
    last_assigned_at: Option<i64>,
    active_assignments: i64,
}

impl From<CandidateRaw> for Candidate {
    fn from(e: CandidateRaw) -> Self {
        Self {
            id: e.candidate_uid.into(),
            name: e.name,
            status: e.status,
            owner_id: e.owner_uid.map(|id| id.into()),
        }
    }
}

impl From<CandidateAssignmentRaw> for CandidateAssignment {
    fn from(e: CandidateAssignmentRaw) -> Self {
        Self {
            id: e.assignment_uid.into(),
            candidate_id: e.candidate_uid.into(),
            user_id: e.user_uid.into(),
            role: e.role,
            active: e.active,
            assigned_at: e.assigned_at,
        }
    }
}

impl From<RoleMemberRaw> for RoleMember {
    fn from(e: RoleMemberRaw) -> Self {
        Self {
            user_id: e.user_uid.into(),
            last_assigned_at: e.last_assigned_at,
            active_assignments: e.active_assignments as usize,
        }
    }
}

#[async_trait::async_trait]
impl ICandidateRepo for PostgresCandidateRepo {
    async fn insert(&self, candidate: &Candidate) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candidates(candidate_uid, name, status, owner_uid)
            VALUES($1, $2, $3, $4)
            "#,
        )
        .bind(candidate.id.inner_ref())
        .bind(&candidate.name)
        .bind(&candidate.status)
        .bind(candidate.owner_id.as_ref().map(|id| id.inner_ref()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert candidate: {:?}. DB returned error: {:?}",
                candidate, e
            );
            e
        })?;
        Ok(())
    }

    async fn save(&self, candidate: &Candidate) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE candidates SET
                name = $2,
                status = $3,
                owner_uid = $4
            WHERE candidate_uid = $1
            "#,
        )
        .bind(candidate.id.inner_ref())
        .bind(&candidate.name)
        .bind(&candidate.status)
        .bind(candidate.owner_id.as_ref().map(|id| id.inner_ref()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, candidate_id: &ID) -> anyhow::Result<Option<Candidate>> {
        let row: Option<CandidateRaw> =
            sqlx::query_as("SELECT * FROM candidates AS c WHERE c.candidate_uid = $1")
                .bind(candidate_id.inner_ref())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|row| row.into()))
    }

    async fn find_active_assignment(
        &self,
        candidate_id: &ID,
        role: &str,
    ) -> anyhow::Result<Option<CandidateAssignment>> {
        let row: Option<CandidateAssignmentRaw> = sqlx::query_as(
            r#"
            SELECT * FROM candidate_assignments AS a
            WHERE a.candidate_uid = $1 AND a.role = $2 AND a.active
            "#,
        )
        .bind(candidate_id.inner_ref())
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.into()))
    }

    async fn assign(&self, assignment: &CandidateAssignment) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE candidate_assignments SET active = false
            WHERE candidate_uid = $1 AND role = $2 AND active
            "#,
        )
        .bind(assignment.candidate_id.inner_ref())
        .bind(&assignment.role)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO candidate_assignments(
                assignment_uid, candidate_uid, user_uid, role, active, assigned_at
            )
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(assignment.id.inner_ref())
        .bind(assignment.candidate_id.inner_ref())
        .bind(assignment.user_id.inner_ref())
        .bind(&assignment.role)
        .bind(assignment.active)
        .bind(assignment.assigned_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE candidates SET owner_uid = $2 WHERE candidate_uid = $1")
            .bind(assignment.candidate_id.inner_ref())
            .bind(assignment.user_id.inner_ref())
            .execute(&mut *tx)
            .await?;
        tx.commit().await.map_err(|e| {
            error!(
                "Unable to assign candidate: {:?}. DB returned error: {:?}",
                assignment, e
            );
            e
        })?;
        Ok(())
    }

    async fn add_role_member(&self, user_id: &ID, role: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO role_members(user_uid, role)
            VALUES($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.inner_ref())
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_role_members(&self, role: &str) -> anyhow::Result<Vec<RoleMember>> {
        let rows: Vec<RoleMemberRaw> = sqlx::query_as(
            r#"
            SELECT
                m.user_uid,
                MAX(a.assigned_at) AS last_assigned_at,
                COUNT(a.assignment_uid) FILTER (WHERE a.active) AS active_assignments
            FROM role_members AS m
            LEFT JOIN candidate_assignments AS a
                ON a.user_uid = m.user_uid AND a.role = m.role
            WHERE m.role = $1
            GROUP BY m.user_uid
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.into()).collect())
    }
}
