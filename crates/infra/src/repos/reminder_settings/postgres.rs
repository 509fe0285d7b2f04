use super::IReminderSettingsRepo;
use followup_scheduler_domain::{ReminderKind, ReminderSettings};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};
use tracing::error;

pub struct PostgresReminderSettingsRepo {
    pool: PgPool,
}

impl PostgresReminderSettingsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderSettingsRaw {
    settings: Value,
}

#[async_trait::async_trait]
impl IReminderSettingsRepo for PostgresReminderSettingsRepo {
    async fn find(&self, kind: ReminderKind) -> anyhow::Result<Option<ReminderSettings>> {
        let row: Option<ReminderSettingsRaw> =
            sqlx::query_as("SELECT s.settings FROM reminder_settings AS s WHERE s.kind = $1")
                .bind(kind.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_value(row.settings)?)),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        kind: ReminderKind,
        settings: &ReminderSettings,
        updated: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_settings(kind, settings, updated)
            VALUES($1, $2, $3)
            ON CONFLICT (kind) DO UPDATE SET
                settings = EXCLUDED.settings,
                updated = EXCLUDED.updated
            "#,
        )
        .bind(kind.as_str())
        .bind(Json(settings))
        .bind(updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to save reminder settings for kind: {}. DB returned error: {:?}",
                kind, e
            );
            e
        })?;

        Ok(())
    }
}
