//! Reconciler: applies task/subtask writes and keeps parent progress in step.
//!
//! Per request, inside one unit of work:
//! validate -> derive -> persist leaf -> classify change -> load siblings -> aggregate
//! -> compare with the stored parent -> persist parent (only if it differs) -> commit.
//!
//! Any error drops the unit of work, so the leaf write and the parent write land together
//! or not at all. Domain events are published after the commit.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, distribution, Aggregate, Distribution, ParentState};
use crate::config::{DerivedFieldPolicy, ReconcileConfig};
use crate::derive::{derive, ProgressChange};
use crate::error::{ReconcileError, Result, ValidationError};
use crate::event::{DomainEvent, EventPublisher};
use crate::model::{NewSubtask, Patch, Progress, Status, Subtask, Task};
use crate::repository::{Store, SubtaskRepository, TaskRepository, UnitOfWork};
use crate::validate::{
    check_equipment, validate_equipment, validate_name, validate_schedule, validate_subtask_input,
    validate_task_input, validate_update, SubtaskInput, TaskInput, UpdateRequest, ValidUpdate,
};

/// Why a parent was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The leaf write did not touch anything aggregation reads.
    InsignificantChange,
    /// The task has no subtasks; its own fields stand.
    NoSubtasks,
    /// Aggregation matched the stored parent.
    Unchanged,
}

/// Outcome of the parent-sync tail. Skipping is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ParentSync {
    Skipped(SkipReason),
    Updated(Task),
}

impl ParentSync {
    pub fn updated(&self) -> Option<&Task> {
        match self {
            ParentSync::Updated(task) => Some(task),
            ParentSync::Skipped(_) => None,
        }
    }
}

/// A persisted entity plus what happened to its parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciled<T> {
    pub entity: T,
    pub parent: ParentSync,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualEquipmentUpdate {
    pub id: String,
    pub actual_equipment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub subtasks: Vec<Subtask>,
    /// One entry per distinct parent, in first-seen order.
    pub parents: Vec<(String, ParentSync)>,
}

/// Read-only progress report for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgress {
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    pub aggregate: Option<Aggregate>,
    pub distribution: Distribution,
    /// Stored parent fields equal what aggregation would produce now.
    pub in_sync: bool,
}

/// Aggregation reads progress and schedule; name/priority edits never reach the parent.
fn significant(before: &Subtask, after: &Subtask) -> bool {
    before.progress != after.progress
        || before.planned_start != after.planned_start
        || before.planned_end != after.planned_end
}

fn completed(before: Status, after: Status) -> bool {
    before != Status::Done && after == Status::Done
}

fn leaf_patch(valid: &ValidUpdate, progress: Progress) -> Patch {
    Patch {
        name: valid.name.clone(),
        priority: valid.priority,
        planned_start: valid.planned_start.map(Some),
        planned_end: valid.planned_end.map(Some),
        ..Patch::default()
    }
    .with_progress(progress)
}

fn merged_schedule(
    valid: &ValidUpdate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> std::result::Result<(), ValidationError> {
    validate_schedule(valid.planned_start.or(start), valid.planned_end.or(end))
}

/// Load siblings, aggregate, and persist the parent when the result differs from it.
async fn sync_parent<T: UnitOfWork>(
    tx: &mut T,
    task_id: &str,
    config: &ReconcileConfig,
    events: &mut Vec<DomainEvent>,
) -> Result<ParentSync> {
    let parent = tx.get_task(task_id).await?;
    let siblings = tx.find_subtasks_by_task(task_id).await?;

    let Some(agg) = aggregate(parent.progress.equipment_count, &siblings) else {
        tracing::debug!(task_id, "no subtasks left; parent keeps its own fields");
        return Ok(ParentSync::Skipped(SkipReason::NoSubtasks));
    };
    if agg.subtasks_allocated > u64::from(parent.progress.equipment_count) {
        tracing::warn!(
            task_id,
            planned = parent.progress.equipment_count,
            allocated = agg.subtasks_allocated,
            "subtasks allocate more equipment than the task plans"
        );
    }

    let target = agg.reconcile(&parent);
    // Aggregated actual counts against the parent's own plan, same policy as a leaf.
    check_equipment(
        task_id,
        &Progress {
            actual_equipment_count: target.actual_equipment_count,
            ..parent.progress
        },
        config,
    )?;
    if target == ParentState::of(&parent) {
        tracing::debug!(task_id, "aggregate matches stored parent");
        return Ok(ParentSync::Skipped(SkipReason::Unchanged));
    }

    let updated = tx.update_task(task_id, &target.to_patch()).await?;
    tracing::info!(
        task_id,
        status = %updated.progress.status,
        completion_rate = updated.progress.completion_rate,
        actual = updated.progress.actual_equipment_count,
        siblings = siblings.len(),
        "parent reconciled"
    );

    events.push(DomainEvent::ParentReconciled {
        task_id: updated.id.clone(),
        status: updated.progress.status,
        completion_rate: updated.progress.completion_rate,
    });
    if completed(parent.progress.status, updated.progress.status) {
        events.push(DomainEvent::TaskCompleted {
            task_id: updated.id.clone(),
            project_id: updated.project_id.clone(),
        });
    }

    Ok(ParentSync::Updated(updated))
}

pub struct Reconciler<S: Store> {
    store: S,
    events: Arc<dyn EventPublisher>,
    config: ReconcileConfig,
}

impl<S: Store> Reconciler<S> {
    pub fn new(store: S, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            events,
            config: ReconcileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    fn publish(&self, events: Vec<DomainEvent>) {
        for event in &events {
            self.events.publish(event);
        }
    }

    async fn commit(&self, tx: S::Tx, events: Vec<DomainEvent>) -> Result<()> {
        tx.commit().await?;
        self.publish(events);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------------

    pub async fn create_task(&self, input: TaskInput) -> Result<Task> {
        let (mut new, change) = validate_task_input(&input, &self.config)?;
        new.progress = derive(&Progress::default(), &change);
        check_equipment(&new.name, &new.progress, &self.config)?;

        let mut tx = self.store.begin().await?;
        let task = tx.create_task(new).await?;

        let mut events = vec![DomainEvent::TaskCreated {
            task_id: task.id.clone(),
            project_id: task.project_id.clone(),
        }];
        if task.progress.status == Status::Done {
            events.push(DomainEvent::TaskCompleted {
                task_id: task.id.clone(),
                project_id: task.project_id.clone(),
            });
        }

        self.commit(tx, events).await?;
        tracing::info!(task_id = %task.id, project_id = %task.project_id, "task created");
        Ok(task)
    }

    /// Update a task. On a task with subtasks the aggregation owns actual equipment,
    /// status and completion rate; see [`DerivedFieldPolicy`].
    pub async fn update_task(&self, id: &str, req: UpdateRequest) -> Result<Reconciled<Task>> {
        let mut valid = validate_update(&req, &self.config)?;

        let mut tx = self.store.begin().await?;
        let before = tx.get_task(id).await?;
        let children = tx.find_subtasks_by_task(id).await?;
        merged_schedule(&valid, before.planned_start, before.planned_end)?;

        let has_children = !children.is_empty();
        if has_children && req.touches_derived_fields() {
            match self.config.derived_fields {
                DerivedFieldPolicy::Reject => {
                    return Err(ReconcileError::InvariantViolation(format!(
                        "task {id} has {} subtasks; its progress is derived from them",
                        children.len()
                    )));
                }
                DerivedFieldPolicy::Ignore => {
                    tracing::debug!(task_id = id, "dropping derived fields from task update");
                    valid = validate_update(&req.without_derived_fields(), &self.config)?;
                }
            }
        }

        let patch = if has_children {
            // Planned total stays the task's own; the rest comes from aggregation.
            Patch {
                name: valid.name.clone(),
                priority: valid.priority,
                equipment_count: valid.change.equipment_count,
                planned_start: valid.planned_start.map(Some),
                planned_end: valid.planned_end.map(Some),
                ..Patch::default()
            }
        } else {
            let progress = derive(&before.progress, &valid.change);
            if valid.change.touches_equipment() {
                check_equipment(id, &progress, &self.config)?;
            }
            leaf_patch(&valid, progress)
        };

        let after = tx.update_task(id, &patch).await?;
        let mut events = vec![DomainEvent::TaskUpdated {
            task_id: after.id.clone(),
            project_id: after.project_id.clone(),
        }];

        let sync = if has_children {
            sync_parent(&mut tx, id, &self.config, &mut events).await?
        } else {
            if completed(before.progress.status, after.progress.status) {
                events.push(DomainEvent::TaskCompleted {
                    task_id: after.id.clone(),
                    project_id: after.project_id.clone(),
                });
            }
            ParentSync::Skipped(SkipReason::NoSubtasks)
        };

        self.commit(tx, events).await?;
        let entity = sync.updated().cloned().unwrap_or(after);
        Ok(Reconciled {
            entity,
            parent: sync,
        })
    }

    pub async fn update_task_status(&self, id: &str, status: Status) -> Result<Reconciled<Task>> {
        self.update_task(id, UpdateRequest::status(status)).await
    }

    pub async fn update_task_completion(&self, id: &str, rate: i32) -> Result<Reconciled<Task>> {
        self.update_task(id, UpdateRequest::completion(rate)).await
    }

    pub async fn set_task_actual_equipment(
        &self,
        id: &str,
        count: i64,
    ) -> Result<Reconciled<Task>> {
        self.update_task(id, UpdateRequest::actual_equipment(count)).await
    }

    /// Delete a task together with its subtasks.
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let task = tx.get_task(id).await?;
        let children = tx.find_subtasks_by_task(id).await?;

        let mut events = Vec::with_capacity(children.len() + 1);
        for child in &children {
            tx.delete_subtask(&child.id).await?;
            events.push(DomainEvent::SubtaskDeleted {
                subtask_id: child.id.clone(),
                task_id: task.id.clone(),
            });
        }
        tx.delete_task(id).await?;
        events.push(DomainEvent::TaskDeleted {
            task_id: task.id.clone(),
            project_id: task.project_id.clone(),
        });

        self.commit(tx, events).await?;
        tracing::info!(task_id = id, subtasks = children.len(), "task deleted");
        Ok(())
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        let tx = self.store.begin().await?;
        Ok(tx.get_task(id).await?)
    }

    /// All tasks, or the tasks of one project.
    pub async fn list_tasks(&self, project_id: Option<&str>) -> Result<Vec<Task>> {
        let tx = self.store.begin().await?;
        let tasks = match project_id {
            Some(p) => tx.find_tasks_by_project(p).await?,
            None => tx.list_tasks().await?,
        };
        Ok(tasks)
    }

    pub async fn task_progress(&self, id: &str) -> Result<TaskProgress> {
        let tx = self.store.begin().await?;
        let task = tx.get_task(id).await?;
        let subtasks = tx.find_subtasks_by_task(id).await?;

        let aggregate = aggregate(task.progress.equipment_count, &subtasks);
        let in_sync = aggregate
            .as_ref()
            .is_none_or(|agg| agg.reconcile(&task) == ParentState::of(&task));
        let distribution = distribution(&task, &subtasks);

        Ok(TaskProgress {
            task,
            subtasks,
            aggregate,
            distribution,
            in_sync,
        })
    }

    /// Recompute a task from its current subtasks regardless of what changed.
    pub async fn reconcile_task(&self, id: &str) -> Result<ParentSync> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();
        let sync = sync_parent(&mut tx, id, &self.config, &mut events).await?;
        self.commit(tx, events).await?;
        Ok(sync)
    }

    // ---------------------------------------------------------------------
    // Subtasks
    // ---------------------------------------------------------------------

    async fn insert_subtask(
        &self,
        mut tx: S::Tx,
        mut new: NewSubtask,
        change: ProgressChange,
    ) -> Result<Reconciled<Subtask>> {
        new.progress = derive(&Progress::default(), &change);
        check_equipment(&new.name, &new.progress, &self.config)?;

        let subtask = tx.create_subtask(new).await?;
        let mut events = vec![DomainEvent::SubtaskCreated {
            subtask_id: subtask.id.clone(),
            task_id: subtask.task_id.clone(),
        }];
        if subtask.progress.status == Status::Done {
            events.push(DomainEvent::SubtaskCompleted {
                subtask_id: subtask.id.clone(),
                task_id: subtask.task_id.clone(),
            });
        }

        // A new child always changes the sibling set.
        let parent = sync_parent(&mut tx, &subtask.task_id, &self.config, &mut events).await?;
        self.commit(tx, events).await?;
        tracing::info!(subtask_id = %subtask.id, task_id = %subtask.task_id, "subtask created");

        Ok(Reconciled {
            entity: subtask,
            parent,
        })
    }

    pub async fn create_subtask(&self, input: SubtaskInput) -> Result<Reconciled<Subtask>> {
        let (new, change) = validate_subtask_input(&input, &self.config)?;

        let tx = self.store.begin().await?;
        tx.get_task(&new.task_id).await?;
        self.insert_subtask(tx, new, change).await
    }

    /// Carve `equipment_count` out of the task's unassigned equipment into a new subtask.
    pub async fn split_task(
        &self,
        task_id: &str,
        name: &str,
        equipment_count: i64,
    ) -> Result<Reconciled<Subtask>> {
        let name = validate_name(name, self.config.max_name_len)?;
        let requested = validate_equipment("equipment_count", equipment_count)?;
        if requested == 0 {
            return Err(ValidationError::EmptySplit.into());
        }

        let tx = self.store.begin().await?;
        let parent = tx.get_task(task_id).await?;
        let siblings = tx.find_subtasks_by_task(task_id).await?;

        let allocated: u64 = siblings
            .iter()
            .map(|s| u64::from(s.progress.equipment_count))
            .sum();
        let remaining = u64::from(parent.progress.equipment_count).saturating_sub(allocated);
        if u64::from(requested) > remaining {
            return Err(ValidationError::SplitExceedsRemaining {
                requested,
                remaining: remaining as u32,
            }
            .into());
        }

        let mut new = NewSubtask::new(parent.id.clone(), name).with_equipment(requested);
        new.priority = parent.priority;
        let change = ProgressChange {
            equipment_count: Some(requested),
            ..ProgressChange::default()
        };
        self.insert_subtask(tx, new, change).await
    }

    pub async fn update_subtask(
        &self,
        id: &str,
        req: UpdateRequest,
    ) -> Result<Reconciled<Subtask>> {
        let valid = validate_update(&req, &self.config)?;

        let mut tx = self.store.begin().await?;
        let before = tx.get_subtask(id).await?;
        merged_schedule(&valid, before.planned_start, before.planned_end)?;

        let progress = derive(&before.progress, &valid.change);
        if valid.change.touches_equipment() {
            check_equipment(id, &progress, &self.config)?;
        }

        let after = tx.update_subtask(id, &leaf_patch(&valid, progress)).await?;
        let mut events = vec![DomainEvent::SubtaskUpdated {
            subtask_id: after.id.clone(),
            task_id: after.task_id.clone(),
        }];
        if completed(before.progress.status, after.progress.status) {
            events.push(DomainEvent::SubtaskCompleted {
                subtask_id: after.id.clone(),
                task_id: after.task_id.clone(),
            });
        }

        let parent = if significant(&before, &after) {
            sync_parent(&mut tx, &after.task_id, &self.config, &mut events).await?
        } else {
            tracing::debug!(subtask_id = id, "insignificant change; parent left alone");
            ParentSync::Skipped(SkipReason::InsignificantChange)
        };

        self.commit(tx, events).await?;
        Ok(Reconciled {
            entity: after,
            parent,
        })
    }

    pub async fn update_subtask_status(
        &self,
        id: &str,
        status: Status,
    ) -> Result<Reconciled<Subtask>> {
        self.update_subtask(id, UpdateRequest::status(status)).await
    }

    pub async fn update_subtask_completion(
        &self,
        id: &str,
        rate: i32,
    ) -> Result<Reconciled<Subtask>> {
        self.update_subtask(id, UpdateRequest::completion(rate)).await
    }

    pub async fn set_subtask_actual_equipment(
        &self,
        id: &str,
        count: i64,
    ) -> Result<Reconciled<Subtask>> {
        self.update_subtask(id, UpdateRequest::actual_equipment(count)).await
    }

    /// Delete a subtask and re-aggregate its parent from the remaining siblings.
    pub async fn delete_subtask(&self, id: &str) -> Result<ParentSync> {
        let mut tx = self.store.begin().await?;
        let subtask = tx.get_subtask(id).await?;
        tx.delete_subtask(id).await?;

        let mut events = vec![DomainEvent::SubtaskDeleted {
            subtask_id: subtask.id.clone(),
            task_id: subtask.task_id.clone(),
        }];
        let parent = sync_parent(&mut tx, &subtask.task_id, &self.config, &mut events).await?;

        self.commit(tx, events).await?;
        tracing::info!(subtask_id = id, task_id = %subtask.task_id, "subtask deleted");
        Ok(parent)
    }

    /// Set actual equipment on many subtasks, aggregating each distinct parent once.
    ///
    /// Every id is resolved before the first write, so an unknown id leaves the store untouched.
    pub async fn batch_update_actual_equipment(
        &self,
        updates: &[ActualEquipmentUpdate],
    ) -> Result<BatchOutcome> {
        let counts = updates
            .iter()
            .map(|u| validate_equipment("actual_equipment_count", u.actual_equipment_count))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut tx = self.store.begin().await?;
        for u in updates {
            tx.get_subtask(&u.id).await?;
        }

        let mut events = Vec::new();
        let mut subtasks = Vec::with_capacity(updates.len());
        // (task_id, any significant change) in first-seen order
        let mut groups: Vec<(String, bool)> = Vec::new();

        for (u, count) in updates.iter().zip(counts) {
            let before = tx.get_subtask(&u.id).await?;
            let progress = derive(&before.progress, &ProgressChange::actual_equipment(count));
            check_equipment(&u.id, &progress, &self.config)?;

            let after = tx
                .update_subtask(&u.id, &Patch::default().with_progress(progress))
                .await?;
            events.push(DomainEvent::SubtaskUpdated {
                subtask_id: after.id.clone(),
                task_id: after.task_id.clone(),
            });
            if completed(before.progress.status, after.progress.status) {
                events.push(DomainEvent::SubtaskCompleted {
                    subtask_id: after.id.clone(),
                    task_id: after.task_id.clone(),
                });
            }

            let changed = significant(&before, &after);
            match groups.iter_mut().find(|group| group.0 == after.task_id) {
                Some(group) => group.1 |= changed,
                None => groups.push((after.task_id.clone(), changed)),
            }
            subtasks.push(after);
        }

        let mut parents = Vec::with_capacity(groups.len());
        for (task_id, changed) in groups {
            let sync = if changed {
                sync_parent(&mut tx, &task_id, &self.config, &mut events).await?
            } else {
                ParentSync::Skipped(SkipReason::InsignificantChange)
            };
            parents.push((task_id, sync));
        }

        self.commit(tx, events).await?;
        tracing::info!(
            subtasks = subtasks.len(),
            parents = parents.len(),
            "batch actual-equipment update applied"
        );

        Ok(BatchOutcome { subtasks, parents })
    }

    pub async fn get_subtask(&self, id: &str) -> Result<Subtask> {
        let tx = self.store.begin().await?;
        Ok(tx.get_subtask(id).await?)
    }

    pub async fn list_subtasks(&self, task_id: &str) -> Result<Vec<Subtask>> {
        let tx = self.store.begin().await?;
        tx.get_task(task_id).await?;
        Ok(tx.find_subtasks_by_task(task_id).await?)
    }
}
