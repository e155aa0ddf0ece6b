//! Persistence seams. The reconciler depends only on these traits.
//!
//! A [`Store`] hands out [`UnitOfWork`]s; every write made through one becomes visible
//! on [`UnitOfWork::commit`] and is discarded if the unit of work is dropped instead.

use async_trait::async_trait;

use crate::error::{EntityKind, StoreError};
use crate::model::{NewSubtask, NewTask, Patch, Subtask, Task};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(&mut self, new: NewTask) -> Result<Task, StoreError>;

    /// Fails with `StoreError::NotFound` when `id` does not exist.
    async fn update_task(&mut self, id: &str, patch: &Patch) -> Result<Task, StoreError>;

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    async fn find_tasks_by_project(&self, project_id: &str) -> Result<Vec<Task>, StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn delete_task(&mut self, id: &str) -> Result<(), StoreError>;

    async fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        self.find_task(id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, id))
    }
}

#[async_trait]
pub trait SubtaskRepository: Send + Sync {
    async fn create_subtask(&mut self, new: NewSubtask) -> Result<Subtask, StoreError>;

    /// Fails with `StoreError::NotFound` when `id` does not exist.
    async fn update_subtask(&mut self, id: &str, patch: &Patch) -> Result<Subtask, StoreError>;

    async fn find_subtask(&self, id: &str) -> Result<Option<Subtask>, StoreError>;

    /// Subtasks of one task, in creation order.
    async fn find_subtasks_by_task(&self, task_id: &str) -> Result<Vec<Subtask>, StoreError>;

    async fn list_subtasks(&self) -> Result<Vec<Subtask>, StoreError>;

    async fn delete_subtask(&mut self, id: &str) -> Result<(), StoreError>;

    async fn get_subtask(&self, id: &str) -> Result<Subtask, StoreError> {
        self.find_subtask(id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Subtask, id))
    }
}

/// Scoped access to both repositories with commit-or-rollback semantics.
#[async_trait]
pub trait UnitOfWork: TaskRepository + SubtaskRepository {
    async fn commit(self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    type Tx: UnitOfWork;

    /// Open a unit of work. Implementations may serialize callers here.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}
