//! Field validators: turn untrusted request values into typed ones.
//!
//! Requests carry signed integers so that negative or oversized input is reported as a
//! validation error instead of failing to deserialize.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ReconcileConfig;
use crate::derive::ProgressChange;
use crate::error::{ReconcileError, ValidationError};
use crate::model::{NewSubtask, NewTask, Priority, Progress, Status};

/// Partial update request for a task or subtask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub priority: Option<i32>,
    pub equipment_count: Option<i64>,
    pub actual_equipment_count: Option<i64>,
    pub status: Option<Status>,
    pub completion_rate: Option<i32>,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

impl UpdateRequest {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn completion(rate: i32) -> Self {
        Self {
            completion_rate: Some(rate),
            ..Self::default()
        }
    }

    pub fn actual_equipment(count: i64) -> Self {
        Self {
            actual_equipment_count: Some(count),
            ..Self::default()
        }
    }

    /// Whether the request writes a field that aggregation owns on a parent task.
    pub fn touches_derived_fields(&self) -> bool {
        self.actual_equipment_count.is_some()
            || self.status.is_some()
            || self.completion_rate.is_some()
    }

    pub fn without_derived_fields(self) -> Self {
        Self {
            actual_equipment_count: None,
            status: None,
            completion_rate: None,
            ..self
        }
    }
}

/// Creation request for a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInput {
    pub name: String,
    pub project_id: String,
    pub engineering_id: Option<String>,
    pub priority: Option<i32>,
    pub equipment_count: Option<i64>,
    pub actual_equipment_count: Option<i64>,
    pub status: Option<Status>,
    pub completion_rate: Option<i32>,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

/// Creation request for a subtask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtaskInput {
    pub task_id: String,
    pub parent_template_id: Option<String>,
    pub name: String,
    pub priority: Option<i32>,
    pub equipment_count: Option<i64>,
    pub actual_equipment_count: Option<i64>,
    pub status: Option<Status>,
    pub completion_rate: Option<i32>,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

/// A validated update: typed fields plus the progress change handed to the deriver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidUpdate {
    pub name: Option<String>,
    pub priority: Option<Priority>,
    pub change: ProgressChange,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

pub fn validate_name(name: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(ValidationError::NameTooLong { len, max: max_len });
    }
    Ok(trimmed.to_string())
}

pub fn validate_priority(level: i32) -> Result<Priority, ValidationError> {
    Priority::from_level(level).ok_or(ValidationError::Priority(level))
}

pub fn validate_completion_rate(rate: i32) -> Result<u8, ValidationError> {
    if !(0..=100).contains(&rate) {
        return Err(ValidationError::CompletionRate(rate));
    }
    Ok(rate as u8)
}

pub fn validate_equipment(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeEquipment { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::EquipmentOverflow { field, value })
}

pub fn validate_schedule(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(s), Some(e)) if s > e => Err(ValidationError::ScheduleInverted {
            start: s.to_string(),
            end: e.to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn validate_reference(field: &'static str, id: &str) -> Result<String, ValidationError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingReference { field });
    }
    Ok(trimmed.to_string())
}

fn validate_change(
    equipment_count: Option<i64>,
    actual_equipment_count: Option<i64>,
    status: Option<Status>,
    completion_rate: Option<i32>,
) -> Result<ProgressChange, ValidationError> {
    Ok(ProgressChange {
        equipment_count: equipment_count
            .map(|v| validate_equipment("equipment_count", v))
            .transpose()?,
        actual_equipment_count: actual_equipment_count
            .map(|v| validate_equipment("actual_equipment_count", v))
            .transpose()?,
        status,
        completion_rate: completion_rate.map(validate_completion_rate).transpose()?,
    })
}

pub fn validate_update(
    req: &UpdateRequest,
    cfg: &ReconcileConfig,
) -> Result<ValidUpdate, ValidationError> {
    Ok(ValidUpdate {
        name: req
            .name
            .as_deref()
            .map(|n| validate_name(n, cfg.max_name_len))
            .transpose()?,
        priority: req.priority.map(validate_priority).transpose()?,
        change: validate_change(
            req.equipment_count,
            req.actual_equipment_count,
            req.status,
            req.completion_rate,
        )?,
        planned_start: req.planned_start,
        planned_end: req.planned_end,
    })
}

/// Validate a task creation request. The returned `NewTask` carries only the planned
/// equipment count; the caller derives the rest of its progress from the change.
pub fn validate_task_input(
    input: &TaskInput,
    cfg: &ReconcileConfig,
) -> Result<(NewTask, ProgressChange), ValidationError> {
    let name = validate_name(&input.name, cfg.max_name_len)?;
    let project_id = validate_reference("project_id", &input.project_id)?;
    let change = validate_change(
        input.equipment_count,
        input.actual_equipment_count,
        input.status,
        input.completion_rate,
    )?;
    validate_schedule(input.planned_start, input.planned_end)?;

    let mut task = NewTask::new(project_id, name)
        .with_equipment(change.equipment_count.unwrap_or(0))
        .with_schedule(input.planned_start, input.planned_end);
    if let Some(engineering_id) = input
        .engineering_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        task = task.with_engineering(engineering_id);
    }
    task.priority = input
        .priority
        .map(validate_priority)
        .transpose()?
        .unwrap_or_default();

    Ok((task, change))
}

pub fn validate_subtask_input(
    input: &SubtaskInput,
    cfg: &ReconcileConfig,
) -> Result<(NewSubtask, ProgressChange), ValidationError> {
    let name = validate_name(&input.name, cfg.max_name_len)?;
    let task_id = validate_reference("task_id", &input.task_id)?;
    let change = validate_change(
        input.equipment_count,
        input.actual_equipment_count,
        input.status,
        input.completion_rate,
    )?;
    validate_schedule(input.planned_start, input.planned_end)?;

    let mut subtask = NewSubtask::new(task_id, name)
        .with_equipment(change.equipment_count.unwrap_or(0))
        .with_schedule(input.planned_start, input.planned_end);
    subtask.parent_template_id = input.parent_template_id.clone();
    subtask.priority = input
        .priority
        .map(validate_priority)
        .transpose()?
        .unwrap_or_default();

    Ok((subtask, change))
}

/// `actual <= planned` check, applied to resolved progress.
///
/// Over-delivery is an invariant violation under `strict_equipment`; otherwise it is
/// allowed and only flagged in the log.
pub fn check_equipment(
    entity_id: &str,
    progress: &Progress,
    cfg: &ReconcileConfig,
) -> Result<(), ReconcileError> {
    if progress.actual_equipment_count <= progress.equipment_count {
        return Ok(());
    }
    if cfg.strict_equipment {
        return Err(ReconcileError::InvariantViolation(format!(
            "{entity_id}: actual equipment {} exceeds planned {}",
            progress.actual_equipment_count, progress.equipment_count
        )));
    }
    tracing::warn!(
        entity = %entity_id,
        actual = progress.actual_equipment_count,
        planned = progress.equipment_count,
        "actual equipment exceeds planned"
    );
    Ok(())
}
