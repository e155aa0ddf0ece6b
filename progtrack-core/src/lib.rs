//! progtrack-core: task/subtask progress model and the reconciliation engine

pub mod aggregate;
pub mod config;
pub mod coordinator;
pub mod derive;
pub mod error;
pub mod event;
pub mod model;
pub mod repository;
pub mod validate;

pub use aggregate::{aggregate, distribution, Aggregate, Distribution, ParentState, Share};
pub use config::{DerivedFieldPolicy, ReconcileConfig};
pub use coordinator::{
    ActualEquipmentUpdate, BatchOutcome, ParentSync, Reconciled, Reconciler, SkipReason,
    TaskProgress,
};
pub use derive::{derive, equipment_rate, ProgressChange};
pub use error::{EntityKind, ReconcileError, StoreError, ValidationError};
pub use event::{
    DomainEvent, EventBus, EventPublisher, LogSubscriber, RecordingSubscriber, Subscriber,
};
pub use model::{NewSubtask, NewTask, Patch, Priority, Progress, Status, Subtask, Task};
pub use repository::{Store, SubtaskRepository, TaskRepository, UnitOfWork};
pub use validate::{SubtaskInput, TaskInput, UpdateRequest};
