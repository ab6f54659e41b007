use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use uuid::Uuid;

use crate::{
    core::utils::{ensure_dir, PathResolver},
    errors::LedgerError,
};

use super::{RawCollection, RecordStore, Result};

const RECORD_EXTENSION: &str = "json";
pub(crate) const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

pub const COLLECTION_SCHEMA_VERSION: u8 = 1;

/// On-disk envelope of one collection file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    #[serde(default = "CollectionFile::schema_version_default")]
    schema_version: u8,
    #[serde(default)]
    records: RawCollection,
}

impl CollectionFile {
    fn schema_version_default() -> u8 {
        COLLECTION_SCHEMA_VERSION
    }
}

/// Describes a snapshot directory created by [`JsonStore::backup`].
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
}

/// Filesystem store keeping one pretty-printed JSON file per collection.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    records_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStore {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let root = PathResolver::resolve_base(root);
        ensure_dir(&root)?;
        let records_dir = PathResolver::records_dir_in(&root);
        let backups_dir = PathResolver::backup_dir_in(&root);
        ensure_dir(&records_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root,
            records_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.records_dir
            .join(format!("{}.{}", canonical_name(collection), RECORD_EXTENSION))
    }

    /// Copies every collection file into a timestamped snapshot directory.
    pub fn backup(&self, note: Option<&str>) -> Result<PathBuf> {
        ensure_dir(&self.backups_dir)?;
        let mut name = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        if let Some(label) = sanitize_backup_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        let mut dir = self.backups_dir.join(&name);
        let mut attempt = 1;
        while dir.exists() {
            attempt += 1;
            dir = self.backups_dir.join(format!("{}-{}", name, attempt));
        }
        ensure_dir(&dir)?;
        for path in self.collection_files()? {
            if let Some(file_name) = path.file_name() {
                fs::copy(&path, dir.join(file_name))?;
            }
        }
        tracing::info!(backup = %dir.display(), "record store backup written");
        self.prune_backups()?;
        Ok(dir)
    }

    /// Snapshots newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            entries.push(BackupInfo {
                created_at: parse_backup_timestamp(&name),
                name,
                path,
            });
        }
        entries.sort_by_key(|info| Reverse((info.created_at, info.name.clone())));
        Ok(entries)
    }

    /// Replaces the live collection files with the contents of a snapshot.
    pub fn restore_backup(&self, name: &str) -> Result<()> {
        let source = self.backups_dir.join(name);
        if !source.is_dir() {
            return Err(LedgerError::Persistence(format!(
                "backup `{}` not found",
                name
            )));
        }
        for path in self.collection_files()? {
            fs::remove_file(path)?;
        }
        for entry in fs::read_dir(&source)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name() {
                fs::copy(&path, self.records_dir.join(file_name))?;
            }
        }
        tracing::info!(backup = name, "record store restored from backup");
        Ok(())
    }

    fn collection_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.records_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        for entry in backups.iter().skip(self.retention) {
            let _ = fs::remove_dir_all(&entry.path);
        }
        Ok(())
    }

    fn load_file(&self, collection: &str) -> Result<CollectionFile> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(CollectionFile::default());
        }
        let data = fs::read_to_string(&path)?;
        let file: CollectionFile = serde_json::from_str(&data)?;
        if file.schema_version > COLLECTION_SCHEMA_VERSION {
            return Err(LedgerError::Persistence(format!(
                "collection `{}` schema v{} is newer than supported v{}",
                collection, file.schema_version, COLLECTION_SCHEMA_VERSION
            )));
        }
        Ok(file)
    }

    fn save_file(&self, collection: &str, file: &CollectionFile) -> Result<()> {
        let path = self.collection_path(collection);
        let json = serde_json::to_string_pretty(file)?;
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl RecordStore for JsonStore {
    fn read_collection(&self, collection: &str) -> Result<RawCollection> {
        Ok(self.load_file(collection)?.records)
    }

    fn write_record(&mut self, collection: &str, id: Uuid, value: Value) -> Result<()> {
        let mut file = self.load_file(collection)?;
        file.schema_version = COLLECTION_SCHEMA_VERSION;
        file.records.insert(id, value);
        self.save_file(collection, &file)?;
        tracing::debug!(collection, %id, "record written");
        Ok(())
    }

    fn remove_record(&mut self, collection: &str, id: Uuid) -> Result<bool> {
        let mut file = self.load_file(collection)?;
        if file.records.remove(&id).is_none() {
            return Ok(false);
        }
        self.save_file(collection, &file)?;
        tracing::debug!(collection, %id, "record removed");
        Ok(true)
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "records".into()
    } else {
        sanitized
    }
}

pub(crate) fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub(crate) fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let mut parts = name.split('_');
    let date_part = parts.next()?;
    let time_part = parts.next()?;
    let time_digits: String = time_part.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !is_digits(date_part, 8) || !is_digits(&time_digits, 6) {
        return None;
    }
    let raw = format!("{}{}", date_part, time_digits);
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}
