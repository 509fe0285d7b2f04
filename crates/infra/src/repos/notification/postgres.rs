use super::INotificationRepo;
use followup_scheduler_domain::{Notification, ID};
use serde_json::Value;
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use std::convert::{TryFrom, TryInto};
use tracing::error;

pub struct PostgresNotificationRepo {
    pool: PgPool,
}

impl PostgresNotificationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRaw {
    notification_uid: Uuid,
    owner_uid: Uuid,
    notification_type: String,
    title: String,
    message: String,
    link: String,
    idempotency_key: String,
    meta: Value,
    read: bool,
    created: i64,
}

impl TryFrom<NotificationRaw> for Notification {
    type Error = anyhow::Error;

    fn try_from(e: NotificationRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: e.notification_uid.into(),
            owner_id: e.owner_uid.into(),
            notification_type: e.notification_type,
            title: e.title,
            message: e.message,
            link: e.link,
            idempotency_key: e.idempotency_key,
            meta: serde_json::from_value(e.meta)?,
            read: e.read,
            created: e.created,
        })
    }
}

#[async_trait::async_trait]
impl INotificationRepo for PostgresNotificationRepo {
    async fn insert_idempotent(
        &self,
        notification: &Notification,
    ) -> anyhow::Result<(Notification, bool)> {
        let inserted: Option<NotificationRaw> = sqlx::query_as(
            r#"
            INSERT INTO notifications(
                notification_uid, owner_uid, notification_type, title, message,
                link, idempotency_key, meta, read, created
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(notification.id.inner_ref())
        .bind(notification.owner_id.inner_ref())
        .bind(&notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .bind(&notification.idempotency_key)
        .bind(Json(&notification.meta))
        .bind(notification.read)
        .bind(notification.created)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert notification: {:?}. DB returned error: {:?}",
                notification, e
            );
            e
        })?;

        if let Some(inserted) = inserted {
            return Ok((inserted.try_into()?, true));
        }

        match self
            .find_by_idempotency_key(&notification.idempotency_key)
            .await?
        {
            Some(existing) => Ok((existing, false)),
            None => Err(anyhow::Error::msg(format!(
                "Notification with idempotency key: {} was neither created nor found",
                notification.idempotency_key
            ))),
        }
    }

    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Notification>> {
        let row: Option<NotificationRaw> =
            sqlx::query_as("SELECT * FROM notifications AS n WHERE n.idempotency_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|row| row.try_into()).transpose()
    }

    async fn find_by_owner(&self, owner_id: &ID) -> anyhow::Result<Vec<Notification>> {
        let rows: Vec<NotificationRaw> = sqlx::query_as(
            "SELECT * FROM notifications AS n WHERE n.owner_uid = $1 ORDER BY n.created DESC",
        )
        .bind(owner_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }
}
