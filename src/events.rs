//! Auth domain events
//!
//! The auth service only needs `publish` to tell it whether delivery is
//! guaranteed. `EventBus` is the in-process broadcast implementation; with no
//! live subscriber a publish is reported as failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Kind of auth event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "user.logged_in")]
    UserLoggedIn,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserLoggedIn => "user.logged_in",
        }
    }
}

/// Notification emitted whenever a token pair is issued
#[derive(Debug, Clone, Serialize)]
pub struct AuthEvent {
    pub kind: EventKind,
    pub account_id: Uuid,
    pub email: String,
    pub metadata: HashMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuthEvent {
    pub fn user_logged_in(account_id: Uuid, email: &str, trigger: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("trigger".to_string(), trigger.to_string());

        Self {
            kind: EventKind::UserLoggedIn,
            account_id,
            email: email.to_string(),
            metadata,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
#[error("event not delivered: {0}")]
pub struct PublishError(pub String);

/// Sink for auth events. `Err` means "not guaranteed delivered".
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AuthEvent) -> Result<(), PublishError>;
}

/// 事件总线
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: AuthEvent) -> Result<(), PublishError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|e| PublishError(format!("no subscriber for {}", e.0.kind.as_str())))
    }
}

/// Attach a subscriber that writes every event to the log
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        kind = event.kind.as_str(),
                        account_id = %event.account_id,
                        trigger = event.metadata.get("trigger").map(String::as_str).unwrap_or(""),
                        "Auth event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
