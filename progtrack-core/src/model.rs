//! Work-item model: tasks, their subtasks and the progress fields both carry.
//!
//! Storage is a separate layer (see `crate::repository`); these types stay small and serializable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// Status implied by a completion rate alone.
    pub fn from_rate(rate: u8) -> Self {
        match rate {
            0 => Status::Todo,
            r if r >= 100 => Status::Done,
            _ => Status::InProgress,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "TODO"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Done => write!(f, "DONE"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "TODO" => Ok(Status::Todo),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    High = 0,
    #[default]
    Normal = 1,
    Low = 2,
}

impl Priority {
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Priority::High),
            1 => Some(Priority::Normal),
            2 => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Equipment and completion fields shared by tasks and subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Planned number of devices/fixtures.
    pub equipment_count: u32,
    /// Devices/fixtures actually finished so far.
    pub actual_equipment_count: u32,
    pub status: Status,
    /// 0-100.
    pub completion_rate: u8,
}

impl Progress {
    pub fn planned(equipment_count: u32) -> Self {
        Self {
            equipment_count,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Done || self.completion_rate >= 100
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub engineering_id: Option<String>,
    pub priority: Priority,

    #[serde(flatten)]
    pub progress: Progress,

    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    /// Owning task.
    pub task_id: String,
    /// Template the subtask was instantiated from; not used by reconciliation.
    pub parent_template_id: Option<String>,
    pub name: String,
    pub priority: Priority,

    #[serde(flatten)]
    pub progress: Progress,

    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated creation props for a task. Stores assign id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub project_id: String,
    pub engineering_id: Option<String>,
    pub priority: Priority,
    pub progress: Progress,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project_id: project_id.into(),
            engineering_id: None,
            priority: Priority::Normal,
            progress: Progress::default(),
            planned_start: None,
            planned_end: None,
        }
    }

    pub fn with_equipment(mut self, planned: u32) -> Self {
        self.progress.equipment_count = planned;
        self
    }

    pub fn with_engineering(mut self, engineering_id: impl Into<String>) -> Self {
        self.engineering_id = Some(engineering_id.into());
        self
    }

    pub fn with_schedule(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.planned_start = start;
        self.planned_end = end;
        self
    }
}

/// Validated creation props for a subtask.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubtask {
    pub task_id: String,
    pub parent_template_id: Option<String>,
    pub name: String,
    pub priority: Priority,
    pub progress: Progress,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
}

impl NewSubtask {
    pub fn new(task_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            parent_template_id: None,
            name: name.into(),
            priority: Priority::Normal,
            progress: Progress::default(),
            planned_start: None,
            planned_end: None,
        }
    }

    pub fn with_equipment(mut self, planned: u32) -> Self {
        self.progress.equipment_count = planned;
        self
    }

    pub fn with_schedule(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.planned_start = start;
        self.planned_end = end;
        self
    }
}

/// Partial update applied by a repository. `None` leaves a field untouched;
/// the schedule fields use `Some(None)` to clear a date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub name: Option<String>,
    pub priority: Option<Priority>,
    pub equipment_count: Option<u32>,
    pub actual_equipment_count: Option<u32>,
    pub status: Option<Status>,
    pub completion_rate: Option<u8>,
    pub planned_start: Option<Option<NaiveDate>>,
    pub planned_end: Option<Option<NaiveDate>>,
}

impl Patch {
    /// Write every progress field of `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.equipment_count = Some(progress.equipment_count);
        self.actual_equipment_count = Some(progress.actual_equipment_count);
        self.status = Some(progress.status);
        self.completion_rate = Some(progress.completion_rate);
        self
    }

    fn apply_fields(
        &self,
        name: &mut String,
        priority: &mut Priority,
        progress: &mut Progress,
        planned_start: &mut Option<NaiveDate>,
        planned_end: &mut Option<NaiveDate>,
    ) {
        if let Some(n) = &self.name {
            *name = n.clone();
        }
        if let Some(p) = self.priority {
            *priority = p;
        }
        if let Some(c) = self.equipment_count {
            progress.equipment_count = c;
        }
        if let Some(c) = self.actual_equipment_count {
            progress.actual_equipment_count = c;
        }
        if let Some(s) = self.status {
            progress.status = s;
        }
        if let Some(r) = self.completion_rate {
            progress.completion_rate = r;
        }
        if let Some(d) = self.planned_start {
            *planned_start = d;
        }
        if let Some(d) = self.planned_end {
            *planned_end = d;
        }
    }

    pub fn apply_to_task(&self, task: &mut Task) {
        self.apply_fields(
            &mut task.name,
            &mut task.priority,
            &mut task.progress,
            &mut task.planned_start,
            &mut task.planned_end,
        );
    }

    pub fn apply_to_subtask(&self, subtask: &mut Subtask) {
        self.apply_fields(
            &mut subtask.name,
            &mut subtask.priority,
            &mut subtask.progress,
            &mut subtask.planned_start,
            &mut subtask.planned_end,
        );
    }
}
