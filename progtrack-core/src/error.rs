//! Error kinds surfaced by validation, storage and reconciliation.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Subtask,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Subtask => write!(f, "subtask"),
        }
    }
}

/// Field-level input problems. Raised before any write; safe to retry after fixing the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must be non-empty")]
    EmptyName,

    #[error("name is {len} characters, max is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("priority must be 0, 1 or 2 (got {0})")]
    Priority(i32),

    #[error("completion rate must be within 0..=100 (got {0})")]
    CompletionRate(i32),

    #[error("{field} must be non-negative (got {value})")]
    NegativeEquipment { field: &'static str, value: i64 },

    #[error("{field} is too large (got {value})")]
    EquipmentOverflow { field: &'static str, value: i64 },

    #[error("planned start {start} is after planned end {end}")]
    ScheduleInverted { start: String, end: String },

    #[error("{field} must be non-empty")]
    MissingReference { field: &'static str },

    #[error("split needs {requested} equipment but only {remaining} is unassigned")]
    SplitExceedsRemaining { requested: u32, remaining: u32 },

    #[error("split must allocate at least one piece of equipment")]
    EmptySplit,
}

/// Failures reported by a repository or unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("backend: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Errors returned by [`crate::Reconciler`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ReconcileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => ReconcileError::NotFound { kind, id },
            StoreError::Backend(msg) => ReconcileError::Storage(msg),
        }
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
