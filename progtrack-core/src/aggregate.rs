//! Equipment aggregation: fold a task's subtasks into parent-level progress.
//!
//! Completion is weighted by each subtask's planned equipment count:
//! `round(sum(weight_i * rate_i) / sum(weight_i))`, 0 when the total weight is 0.
//! An empty subtask set yields `None`: the parent keeps its own fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Patch, Status, Subtask, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub subtask_count: usize,
    pub subtasks_allocated: u64,
    pub subtasks_actual: u64,
    /// Parent planned equipment not yet assigned to a subtask. Never negative.
    pub parent_remaining: u64,
    pub completion_rate: u8,
    pub all_done: bool,
    pub status: Status,
    pub earliest_start: Option<NaiveDate>,
    pub latest_end: Option<NaiveDate>,
}

/// The parent fields reconciliation owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentState {
    pub actual_equipment_count: u32,
    pub status: Status,
    pub completion_rate: u8,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

impl ParentState {
    pub fn of(task: &Task) -> Self {
        Self {
            actual_equipment_count: task.progress.actual_equipment_count,
            status: task.progress.status,
            completion_rate: task.progress.completion_rate,
            planned_start: task.planned_start,
            planned_end: task.planned_end,
        }
    }

    pub fn to_patch(&self) -> Patch {
        Patch {
            actual_equipment_count: Some(self.actual_equipment_count),
            status: Some(self.status),
            completion_rate: Some(self.completion_rate),
            planned_start: Some(self.planned_start),
            planned_end: Some(self.planned_end),
            ..Patch::default()
        }
    }
}

fn weighted_rate(subtasks: &[Subtask]) -> u8 {
    let (weighted, total) = subtasks.iter().fold((0u64, 0u64), |(acc, w), s| {
        let weight = u64::from(s.progress.equipment_count);
        (acc + weight * u64::from(s.progress.completion_rate.min(100)), w + weight)
    });
    if total == 0 {
        return 0;
    }
    ((weighted + total / 2) / total).min(100) as u8
}

pub fn aggregate(parent_equipment_count: u32, subtasks: &[Subtask]) -> Option<Aggregate> {
    if subtasks.is_empty() {
        return None;
    }

    let subtasks_allocated: u64 = subtasks
        .iter()
        .map(|s| u64::from(s.progress.equipment_count))
        .sum();
    let subtasks_actual: u64 = subtasks
        .iter()
        .map(|s| u64::from(s.progress.actual_equipment_count))
        .sum();
    let parent_remaining = u64::from(parent_equipment_count).saturating_sub(subtasks_allocated);

    let all_done = subtasks.iter().all(|s| s.progress.is_complete());

    // Keep DONE <=> 100 for the parent: rounding alone must not reach either side.
    let completion_rate = if all_done {
        100
    } else {
        weighted_rate(subtasks).min(99)
    };

    let status = if all_done {
        Status::Done
    } else if completion_rate > 0 {
        Status::InProgress
    } else {
        Status::Todo
    };

    Some(Aggregate {
        subtask_count: subtasks.len(),
        subtasks_allocated,
        subtasks_actual,
        parent_remaining,
        completion_rate,
        all_done,
        status,
        earliest_start: subtasks.iter().filter_map(|s| s.planned_start).min(),
        latest_end: subtasks.iter().filter_map(|s| s.planned_end).max(),
    })
}

impl Aggregate {
    /// Target state for `parent`. The schedule window is widened, never narrowed.
    pub fn reconcile(&self, parent: &Task) -> ParentState {
        let planned_start = match (parent.planned_start, self.earliest_start) {
            (Some(own), Some(child)) => Some(own.min(child)),
            (own, child) => own.or(child),
        };
        let planned_end = match (parent.planned_end, self.latest_end) {
            (Some(own), Some(child)) => Some(own.max(child)),
            (own, child) => own.or(child),
        };

        ParentState {
            actual_equipment_count: u32::try_from(self.subtasks_actual).unwrap_or(u32::MAX),
            status: self.status,
            completion_rate: self.completion_rate,
            planned_start,
            planned_end,
        }
    }
}

/// One subtask's slice of the parent's planned equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub subtask_id: String,
    pub name: String,
    pub equipment_count: u32,
    pub actual_equipment_count: u32,
    pub status: Status,
    pub completion_rate: u8,
    /// Percent of the parent's planned equipment, rounded.
    pub share_pct: u8,
}

/// Allocated vs. actual equipment for a task, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub task_id: String,
    pub planned: u32,
    pub allocated: u64,
    pub remaining: u64,
    pub actual: u64,
    /// Subtasks together were given more than the parent planned.
    pub over_allocated: bool,
    pub shares: Vec<Share>,
}

pub fn distribution(parent: &Task, subtasks: &[Subtask]) -> Distribution {
    let planned = parent.progress.equipment_count;
    let allocated: u64 = subtasks
        .iter()
        .map(|s| u64::from(s.progress.equipment_count))
        .sum();
    let actual: u64 = subtasks
        .iter()
        .map(|s| u64::from(s.progress.actual_equipment_count))
        .sum();

    let shares = subtasks
        .iter()
        .map(|s| Share {
            subtask_id: s.id.clone(),
            name: s.name.clone(),
            equipment_count: s.progress.equipment_count,
            actual_equipment_count: s.progress.actual_equipment_count,
            status: s.progress.status,
            completion_rate: s.progress.completion_rate,
            share_pct: crate::derive::equipment_rate(s.progress.equipment_count, planned),
        })
        .collect();

    Distribution {
        task_id: parent.id.clone(),
        planned,
        allocated,
        remaining: u64::from(planned).saturating_sub(allocated),
        actual,
        over_allocated: allocated > u64::from(planned),
        shares,
    }
}
