use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Reverse,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        services::ShortagePolicy,
        utils::{ensure_dir, PathResolver},
    },
    errors::LedgerError,
    storage::json_backend::{
        parse_backup_timestamp, sanitize_backup_note, tmp_path, write_atomic,
        BACKUP_TIMESTAMP_FORMAT,
    },
};

const BACKUP_EXTENSION: &str = "json";

/// Prasad owed per seva booking when a link does not override it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SevaRates {
    pub paid_per_booking: f64,
    pub free_per_booking: f64,
}

impl Default for SevaRates {
    fn default() -> Self {
        Self {
            paid_per_booking: 0.2,
            free_per_booking: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub seva_rates: SevaRates,
    /// Unit recorded for distributions that do not name one.
    pub default_unit: String,
    pub shortage_policy: ShortagePolicy,
    /// Record-store snapshots kept before the oldest are pruned.
    pub backup_retention: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seva_rates: SevaRates::default(),
            default_unit: "kg".into(),
            shortage_policy: ShortagePolicy::default(),
            backup_retention: 5,
            data_dir: None,
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, LedgerError> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, LedgerError> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        let backups_dir = PathResolver::config_backup_dir_in(&base);
        ensure_dir(&backups_dir)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            backups_dir,
        })
    }

    /// Loads the stored configuration, falling back to defaults when none exists.
    pub fn load(&self) -> Result<Config, LedgerError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, LedgerError> {
        ensure_dir(&self.backups_dir)?;
        let mut name = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        if let Some(label) = sanitize_backup_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        name.push_str(&format!(".{}", BACKUP_EXTENSION));
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.backups_dir.join(&name), &json)?;
        tracing::info!(backup = %name, "configuration backed up");
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<Config, LedgerError> {
        let path = self.backups_dir.join(backup_name);
        if !path.exists() {
            return Err(LedgerError::Persistence(format!(
                "configuration backup `{}` not found",
                backup_name
            )));
        }
        let data = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&data)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, LedgerError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by_key(|name| Reverse((parse_backup_timestamp(name), name.clone())));
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
