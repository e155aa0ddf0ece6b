//! Domain notifications emitted after committed writes.
//!
//! Delivery is synchronous fan-out to whatever subscribers are registered; there is no
//! queue and no retry.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::model::Status;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCreated { task_id: String, project_id: String },
    TaskUpdated { task_id: String, project_id: String },
    TaskCompleted { task_id: String, project_id: String },
    TaskDeleted { task_id: String, project_id: String },
    SubtaskCreated { subtask_id: String, task_id: String },
    SubtaskUpdated { subtask_id: String, task_id: String },
    SubtaskCompleted { subtask_id: String, task_id: String },
    SubtaskDeleted { subtask_id: String, task_id: String },
    ParentReconciled {
        task_id: String,
        status: Status,
        completion_rate: u8,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "task_created",
            Self::TaskUpdated { .. } => "task_updated",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::SubtaskCreated { .. } => "subtask_created",
            Self::SubtaskUpdated { .. } => "subtask_updated",
            Self::SubtaskCompleted { .. } => "subtask_completed",
            Self::SubtaskDeleted { .. } => "subtask_deleted",
            Self::ParentReconciled { .. } => "parent_reconciled",
        }
    }

    /// Task the event concerns (the owning task for subtask events).
    pub fn task_id(&self) -> &str {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskUpdated { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskDeleted { task_id, .. }
            | Self::SubtaskCreated { task_id, .. }
            | Self::SubtaskUpdated { task_id, .. }
            | Self::SubtaskCompleted { task_id, .. }
            | Self::SubtaskDeleted { task_id, .. }
            | Self::ParentReconciled { task_id, .. } => task_id,
        }
    }
}

pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &DomainEvent);
}

impl<F> Subscriber for F
where
    F: Fn(&DomainEvent) + Send + Sync,
{
    fn on_event(&self, event: &DomainEvent) {
        self(event)
    }
}

pub trait EventPublisher: Send + Sync {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>);
    fn publish(&self, event: &DomainEvent);
}

/// In-process fan-out publisher.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventPublisher for EventBus {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.write().push(subscriber);
    }

    fn publish(&self, event: &DomainEvent) {
        // Snapshot so a subscriber may subscribe others without deadlocking.
        let subscribers = self.subscribers.read().clone();
        for s in subscribers {
            s.on_event(event);
        }
    }
}

/// Writes every event as a `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSubscriber;

impl Subscriber for LogSubscriber {
    fn on_event(&self, event: &DomainEvent) {
        tracing::info!(kind = event.name(), task_id = event.task_id(), ?event, "domain event");
    }
}

/// Keeps published events in memory.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSubscriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DomainEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Subscriber for RecordingSubscriber {
    fn on_event(&self, event: &DomainEvent) {
        self.events.lock().push(event.clone());
    }
}
