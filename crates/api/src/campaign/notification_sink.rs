use followup_scheduler_api_structs::dtos::ReminderRecordDTO;
use followup_scheduler_domain::{Notification, ReminderRecord};
use followup_scheduler_infra::FollowupContext;
use serde_json::json;
use tracing::{debug, warn};

pub const REMINDER_EVENT: &str = "reminder";
pub const ESCALATION_EVENT: &str = "escalation";

/// Stores the notification and pushes it to the owner in realtime.
///
/// Returns whether the notification was new. A notification that already
/// existed for the idempotency key is not pushed again.
pub async fn deliver(
    notification: &Notification,
    record: &ReminderRecord,
    event_name: &str,
    ctx: &FollowupContext,
) -> anyhow::Result<bool> {
    let (notification, created) = ctx
        .repos
        .notification_repo
        .insert_idempotent(notification)
        .await?;
    if !created {
        debug!(
            "Notification with key: {} was delivered before",
            notification.idempotency_key
        );
        return Ok(false);
    }

    push(&notification, record, event_name, ctx).await;
    Ok(true)
}

/// Emits the realtime event of a stored notification. A failing push is only logged.
pub async fn push(
    notification: &Notification,
    record: &ReminderRecord,
    event_name: &str,
    ctx: &FollowupContext,
) {
    let payload = json!({
        "kind": record.kind,
        "record": ReminderRecordDTO::new(record.clone()),
        "link": notification.link,
        "notification": notification,
    });
    if let Err(e) = ctx
        .realtime
        .emit_to_owner(&notification.owner_id, event_name, payload)
        .await
    {
        warn!(
            "Unable to push {} event to owner: {}. Error: {:?}",
            event_name, notification.owner_id, e
        );
    }
}
