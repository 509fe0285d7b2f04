mod realtime;

pub use realtime::{
    IRealtimePublisher, InMemoryRealtimePublisher, LogRealtimePublisher, RealtimeEvent,
    WebhookRealtimePublisher,
};
