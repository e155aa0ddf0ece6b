//! Reconciliation policy knobs. Loaded from the `[reconcile]` table of the CLI config.

use serde::{Deserialize, Serialize};

/// What to do with a direct write to a field the aggregation owns
/// (actual equipment, status, completion rate) on a task that has subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedFieldPolicy {
    /// Fail the update with an invariant violation.
    #[default]
    Reject,
    /// Drop the derived fields from the update and apply the rest.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub max_name_len: usize,
    /// Enforce `actual_equipment_count <= equipment_count`.
    pub strict_equipment: bool,
    pub derived_fields: DerivedFieldPolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            strict_equipment: true,
            derived_fields: DerivedFieldPolicy::Reject,
        }
    }
}

impl ReconcileConfig {
    pub fn lenient() -> Self {
        Self {
            strict_equipment: false,
            derived_fields: DerivedFieldPolicy::Ignore,
            ..Self::default()
        }
    }
}
