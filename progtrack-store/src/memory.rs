//! In-memory store with unit-of-work transactions.
//!
//! `begin` takes the store-wide lock and stages a copy of the committed state; the lock is
//! held until the unit of work is committed or dropped, so reconciliation passes never
//! interleave. `commit` swaps the staged copy in (writing the snapshot file first when the
//! store is file-backed). Dropping without commit discards every staged write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use progtrack_core::{
    EntityKind, NewSubtask, NewTask, Patch, Store, StoreError, Subtask, SubtaskRepository, Task,
    TaskRepository, UnitOfWork,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::snapshot::{self, Snapshot};

/// Operations that can be made to fail once, for exercising rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    TaskUpdate,
    SubtaskUpdate,
    Commit,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<Snapshot>>,
    path: Option<PathBuf>,
    fail: Arc<parking_lot::Mutex<Option<FailPoint>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
            path: None,
            fail: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// File-backed store: loads `path` if it exists and rewrites it on every commit.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = snapshot::load(&path)?;
        tracing::debug!(
            path = %path.display(),
            tasks = snapshot.tasks.len(),
            subtasks = snapshot.subtasks.len(),
            "snapshot loaded"
        );
        Ok(Self {
            path: Some(path),
            ..Self::from_snapshot(snapshot)
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.clone()
    }

    /// Make the next matching operation fail with a backend error.
    pub fn fail_once(&self, point: FailPoint) {
        *self.fail.lock() = Some(point);
    }

    fn take_failure(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut slot = self.fail.lock();
        if *slot == Some(point) {
            *slot = None;
            return Err(StoreError::Backend(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(MemoryTx {
            guard,
            staged,
            store: self.clone(),
        })
    }
}

/// Unit of work over a [`MemoryStore`].
pub struct MemoryTx {
    guard: OwnedMutexGuard<Snapshot>,
    staged: Snapshot,
    store: MemoryStore,
}

impl std::fmt::Debug for MemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTx")
            .field("tasks", &self.staged.tasks.len())
            .field("subtasks", &self.staged.subtasks.len())
            .finish()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl TaskRepository for MemoryTx {
    async fn create_task(&mut self, new: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: new_id(),
            name: new.name,
            project_id: new.project_id,
            engineering_id: new.engineering_id,
            priority: new.priority,
            progress: new.progress,
            planned_start: new.planned_start,
            planned_end: new.planned_end,
            created_at: now,
            updated_at: now,
        };
        self.staged.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&mut self, id: &str, patch: &Patch) -> Result<Task, StoreError> {
        self.store.take_failure(FailPoint::TaskUpdate)?;
        let task = self
            .staged
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, id))?;
        patch.apply_to_task(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.staged.task(id).cloned())
    }

    async fn find_tasks_by_project(&self, project_id: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .staged
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.staged.tasks.clone())
    }

    async fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.staged.tasks.len();
        self.staged.tasks.retain(|t| t.id != id);
        if self.staged.tasks.len() == before {
            return Err(StoreError::not_found(EntityKind::Task, id));
        }
        Ok(())
    }
}

#[async_trait]
impl SubtaskRepository for MemoryTx {
    async fn create_subtask(&mut self, new: NewSubtask) -> Result<Subtask, StoreError> {
        if self.staged.task(&new.task_id).is_none() {
            return Err(StoreError::not_found(EntityKind::Task, new.task_id));
        }
        let now = Utc::now();
        let subtask = Subtask {
            id: new_id(),
            task_id: new.task_id,
            parent_template_id: new.parent_template_id,
            name: new.name,
            priority: new.priority,
            progress: new.progress,
            planned_start: new.planned_start,
            planned_end: new.planned_end,
            created_at: now,
            updated_at: now,
        };
        self.staged.subtasks.push(subtask.clone());
        Ok(subtask)
    }

    async fn update_subtask(&mut self, id: &str, patch: &Patch) -> Result<Subtask, StoreError> {
        self.store.take_failure(FailPoint::SubtaskUpdate)?;
        let subtask = self
            .staged
            .subtasks
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Subtask, id))?;
        patch.apply_to_subtask(subtask);
        subtask.updated_at = Utc::now();
        Ok(subtask.clone())
    }

    async fn find_subtask(&self, id: &str) -> Result<Option<Subtask>, StoreError> {
        Ok(self.staged.subtask(id).cloned())
    }

    async fn find_subtasks_by_task(&self, task_id: &str) -> Result<Vec<Subtask>, StoreError> {
        Ok(self
            .staged
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn list_subtasks(&self) -> Result<Vec<Subtask>, StoreError> {
        Ok(self.staged.subtasks.clone())
    }

    async fn delete_subtask(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.staged.subtasks.len();
        self.staged.subtasks.retain(|s| s.id != id);
        if self.staged.subtasks.len() == before {
            return Err(StoreError::not_found(EntityKind::Subtask, id));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryTx {
    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx {
            mut guard,
            staged,
            store,
        } = self;

        store.take_failure(FailPoint::Commit)?;
        if let Some(path) = store.path() {
            snapshot::save(path, &staged)?;
            tracing::debug!(path = %path.display(), "snapshot written");
        }
        *guard = staged;
        Ok(())
    }
}
