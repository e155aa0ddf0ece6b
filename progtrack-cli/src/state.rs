use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$PROGTRACK_HOME`, or `~/.progtrack`.
pub fn progtrack_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("PROGTRACK_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".progtrack"))
}

pub fn ensure_progtrack_home() -> Result<PathBuf> {
    let dir = progtrack_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_store_path() -> Result<PathBuf> {
    Ok(ensure_progtrack_home()?.join("store.json"))
}
