//! # Event Publisher
//!
//! Best-effort delivery of [`DomainEvent`]s. The actor never lets a publish failure change
//! the outcome of the operation that produced the event.
//!
//! [`BroadcastEventPublisher`] wraps each event in a CloudEvents 1.0 envelope and fans it
//! out to in-process subscribers over a tokio broadcast channel.

use crate::model::DomainEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

pub const CLOUD_EVENTS_SPEC_VERSION: &str = "1.0";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Encode(String),

    #[error("No subscribers for {0}")]
    NoSubscribers(String),

    #[error("Event bus unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;
}

/// CloudEvents 1.0 structured-mode envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub id: String,
    pub subject: String,
    pub time: DateTime<Utc>,
    pub datacontenttype: String,
    pub data: Value,
}

impl CloudEvent {
    pub fn wrap(event: &DomainEvent, source: &str) -> Result<Self, PublishError> {
        let data =
            serde_json::to_value(&event.payload).map_err(|e| PublishError::Encode(e.to_string()))?;
        Ok(Self {
            specversion: CLOUD_EVENTS_SPEC_VERSION.to_string(),
            event_type: event.event_type().to_string(),
            source: source.to_string(),
            id: Uuid::new_v4().to_string(),
            subject: event.user_id.to_string(),
            time: event.occurred_at,
            datacontenttype: "application/json".to_string(),
            data,
        })
    }
}

/// Publishes CloudEvents to every current subscriber.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    source: String,
    sender: broadcast::Sender<CloudEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(source: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            source: source.into(),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CloudEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let envelope = CloudEvent::wrap(event, &self.source)?;
        let id = envelope.id.clone();
        let receivers = self
            .sender
            .send(envelope)
            .map_err(|_| PublishError::NoSubscribers(event.event_type().to_string()))?;
        debug!(
            event_type = event.event_type(),
            user_id = event.user_id,
            %id,
            receivers,
            "Published event"
        );
        Ok(())
    }
}
