//! Subscription types for change events.

use crate::error;
use crate::model::TrackedModel;
use crate::tracker::ChangeTracker;
use crate::types::{Changes, EventKind, Sequence, Value};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Filter by model name (None = all models).
    pub models: Option<Vec<String>>,

    /// Filter by event kind (None = saves and deletes).
    pub events: Option<Vec<EventKind>>,
}

impl SubscriptionFilter {
    /// Subscribe to everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Subscribe to specific models.
    pub fn models(models: Vec<String>) -> Self {
        Self {
            models: Some(models),
            ..Default::default()
        }
    }

    /// Subscribe to specific event kinds.
    pub fn events(events: Vec<EventKind>) -> Self {
        Self {
            events: Some(events),
            ..Default::default()
        }
    }

    /// Check if an event from `model` of kind `event` passes the filter.
    pub fn matches(&self, model: &str, event: EventKind) -> bool {
        if let Some(ref models) = self.models {
            if !models.iter().any(|m| m == model) {
                return false;
            }
        }

        if let Some(ref events) = self.events {
            if !events.contains(&event) {
                return false;
            }
        }

        true
    }
}

/// Events emitted by subscriptions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A tracked instance was saved or deleted.
    Changed {
        model: String,
        event: EventKind,
        sequence: Sequence,
        /// Live primary key after the event (unset after a delete).
        primary_key: Value,
        /// Changes from the previous state to the new current state.
        changes: Changes,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

impl ChangeEvent {
    /// Build a change event from a tracker that just captured.
    pub fn from_tracker<M: TrackedModel>(tracker: &ChangeTracker<M>) -> error::Result<Self> {
        Ok(ChangeEvent::Changed {
            model: M::MODEL_NAME.to_string(),
            event: tracker.last_event(),
            sequence: tracker.sequence(),
            primary_key: tracker.instance().primary_key(),
            changes: tracker.changes()?,
        })
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// Registry was cleared.
    RegistryCleared,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<ChangeEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ChangeEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ChangeEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ChangeEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
