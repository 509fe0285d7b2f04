use followup_scheduler_domain::ID;
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::info;

/// Pushes events to the connected clients of an owner.
///
/// Delivery is fire and forget: callers log failures and carry on.
#[async_trait::async_trait]
pub trait IRealtimePublisher: Send + Sync {
    async fn emit_to_owner(
        &self,
        owner_id: &ID,
        event_name: &str,
        payload: Value,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    pub owner_id: ID,
    pub event_name: String,
    pub payload: Value,
}

/// Forwards events to the service holding the websocket connections
pub struct WebhookRealtimePublisher {
    client: reqwest::Client,
    url: String,
    key: String,
}

impl WebhookRealtimePublisher {
    pub fn new(url: String, key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            key,
        }
    }
}

#[async_trait::async_trait]
impl IRealtimePublisher for WebhookRealtimePublisher {
    async fn emit_to_owner(
        &self,
        owner_id: &ID,
        event_name: &str,
        payload: Value,
    ) -> anyhow::Result<()> {
        let event = RealtimeEvent {
            owner_id: owner_id.clone(),
            event_name: event_name.to_string(),
            payload,
        };
        self.client
            .post(&self.url)
            .header("followup-scheduler-webhook-key", &self.key)
            .json(&event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no realtime endpoint is configured
pub struct LogRealtimePublisher {}

#[async_trait::async_trait]
impl IRealtimePublisher for LogRealtimePublisher {
    async fn emit_to_owner(
        &self,
        owner_id: &ID,
        event_name: &str,
        payload: Value,
    ) -> anyhow::Result<()> {
        info!(
            "Realtime event: {} to owner: {} with payload: {}",
            event_name, owner_id, payload
        );
        Ok(())
    }
}

/// Keeps every emitted event so that tests can inspect them
pub struct InMemoryRealtimePublisher {
    events: Mutex<Vec<RealtimeEvent>>,
}

impl InMemoryRealtimePublisher {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<RealtimeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for InMemoryRealtimePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IRealtimePublisher for InMemoryRealtimePublisher {
    async fn emit_to_owner(
        &self,
        owner_id: &ID,
        event_name: &str,
        payload: Value,
    ) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(RealtimeEvent {
            owner_id: owner_id.clone(),
            event_name: event_name.to_string(),
            payload,
        });
        Ok(())
    }
}
