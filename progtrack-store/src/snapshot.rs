//! Snapshot file: the whole record set as pretty JSON.

use std::fs;
use std::path::Path;

use progtrack_core::{StoreError, Subtask, Task};
use serde::{Deserialize, Serialize};

/// Committed state of a store. Vectors keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Snapshot {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn subtask(&self, id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }
}

fn backend(context: &str, path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{context} {}: {err}", path.display()))
}

/// Load a snapshot; a missing file is an empty store.
pub fn load(path: &Path) -> Result<Snapshot, StoreError> {
    if !path.exists() {
        return Ok(Snapshot::default());
    }
    let s = fs::read_to_string(path).map_err(|e| backend("read", path, e))?;
    if s.trim().is_empty() {
        return Ok(Snapshot::default());
    }
    serde_json::from_str(&s).map_err(|e| backend("parse", path, e))
}

/// Write via a sibling temp file and rename, so readers never see a half-written file.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| backend("create", dir, e))?;
    }
    let json = serde_json::to_string_pretty(snapshot).map_err(|e| backend("serialize", path, e))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| backend("write", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| backend("rename", path, e))?;
    Ok(())
}
