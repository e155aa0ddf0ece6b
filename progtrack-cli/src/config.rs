use anyhow::{Context, Result};
use progtrack_core::ReconcileConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::{default_store_path, ensure_progtrack_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reconcile: ReconcileConfig,
    pub store: StoreSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Snapshot file (default: `<home>/store.json`)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(p) => Ok(p.clone()),
            None => default_store_path(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_progtrack_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use progtrack_core::DerivedFieldPolicy;

    fn parse(s: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(s)
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let cfg = parse(
            r#"
[reconcile]
strict_equipment = false
derived_fields = "ignore"

[store]
path = "/tmp/progtrack/store.json"
"#,
        )
        .unwrap();

        assert!(!cfg.reconcile.strict_equipment);
        assert_eq!(cfg.reconcile.derived_fields, DerivedFieldPolicy::Ignore);
        assert_eq!(cfg.reconcile.max_name_len, 100);
        assert_eq!(cfg.store_path().unwrap(), PathBuf::from("/tmp/progtrack/store.json"));
        assert_eq!(cfg.log.filter, "warn");
    }

    #[test]
    fn defaults_survive_a_write() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(parse(&s).unwrap(), Config::default());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(parse("[reconcile]\nderived_fields = \"overwrite\"\n").is_err());
    }
}
