use std::{
    cmp::Reverse,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use pace_core::{CoreError, SnapshotBackupInfo, SnapshotStorage};
use pace_domain::{note_slug, Snapshot};

use crate::{
    fs_util::{
        canonical_name, json_files, parse_stamp, read_json, remove_if_exists, write_json_atomic,
        JSON_EXTENSION, STAMP_FORMAT,
    },
    StoragePaths,
};

/// Version written into every stored snapshot.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
const DEFAULT_RETENTION: usize = 5;

/// On-disk wrapper around a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSnapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

/// One JSON file per user, with rotating backups of previous saves.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStorage {
    snapshot_root: PathBuf,
    backup_root: PathBuf,
    retention: usize,
}

impl JsonSnapshotStorage {
    pub fn new(paths: &StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: &StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.snapshot_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        Ok(Self {
            snapshot_root: paths.snapshot_root.clone(),
            backup_root: paths.backup_root.clone(),
            retention: retention.max(1),
        })
    }

    pub fn snapshot_path(&self, user_id: &str) -> PathBuf {
        self.snapshot_root
            .join(format!("{}.{JSON_EXTENSION}", canonical_name(user_id)))
    }

    /// Slugs of every user with a saved snapshot.
    pub fn list_users(&self) -> Result<Vec<String>, CoreError> {
        Ok(json_files(&self.snapshot_root)?
            .iter()
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
            .map(str::to_string)
            .collect())
    }

    /// Removes a user's snapshot. Backups are kept.
    pub fn delete(&self, user_id: &str) -> Result<bool, CoreError> {
        remove_if_exists(&self.snapshot_path(user_id))
    }

    /// Writes `snapshot` as a named backup without touching the live file.
    pub fn backup(
        &self,
        user_id: &str,
        snapshot: &Snapshot,
        note: Option<&str>,
    ) -> Result<SnapshotBackupInfo, CoreError> {
        let slug = canonical_name(user_id);
        let stamp = Local::now().format(STAMP_FORMAT).to_string();
        let file_name = match note.and_then(note_slug) {
            Some(label) => format!("{slug}_{stamp}_{label}.{JSON_EXTENSION}"),
            None => format!("{slug}_{stamp}.{JSON_EXTENSION}"),
        };
        let path = self.backup_dir(user_id).join(&file_name);
        write_json_atomic(&path, &wrap(snapshot))?;
        self.prune_backups(user_id)?;
        tracing::info!(user = %slug, backup = %file_name, "created snapshot backup");
        Ok(SnapshotBackupInfo {
            user_id: slug,
            id: file_name,
            created_at: stamp,
            path,
        })
    }

    /// Backups for a user, newest first.
    pub fn list_backups(&self, user_id: &str) -> Result<Vec<SnapshotBackupInfo>, CoreError> {
        let slug = canonical_name(user_id);
        let mut entries: Vec<SnapshotBackupInfo> = json_files(&self.backup_dir(user_id))?
            .into_iter()
            .filter_map(|path| {
                let id = path.file_name()?.to_str()?.to_string();
                let created_at = parse_stamp(&id, &slug)?
                    .format(STAMP_FORMAT)
                    .to_string();
                Some(SnapshotBackupInfo {
                    user_id: slug.clone(),
                    id,
                    created_at,
                    path,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            Reverse(&a.created_at)
                .cmp(&Reverse(&b.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Copies a backup over the live snapshot and returns its contents.
    pub fn restore_backup(&self, backup: &SnapshotBackupInfo) -> Result<Snapshot, CoreError> {
        if !backup.path.is_file() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let snapshot = load_snapshot_file(&backup.path)?;
        write_json_atomic(&self.snapshot_path(&backup.user_id), &wrap(&snapshot))?;
        tracing::info!(user = %backup.user_id, backup = %backup.id, "restored snapshot backup");
        Ok(snapshot)
    }

    fn backup_dir(&self, user_id: &str) -> PathBuf {
        self.backup_root.join(canonical_name(user_id))
    }

    fn backup_existing(&self, user_id: &str, live: &Path) -> Result<(), CoreError> {
        if !live.exists() {
            return Ok(());
        }
        let slug = canonical_name(user_id);
        let stamp = Local::now().format(STAMP_FORMAT);
        let dir = self.backup_dir(user_id);
        fs::create_dir_all(&dir)?;
        fs::copy(live, dir.join(format!("{slug}_{stamp}.{JSON_EXTENSION}")))?;
        self.prune_backups(user_id)
    }

    fn prune_backups(&self, user_id: &str) -> Result<(), CoreError> {
        for stale in self.list_backups(user_id)?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                tracing::warn!(backup = %stale.id, %err, "failed to prune snapshot backup");
            }
        }
        Ok(())
    }
}

impl SnapshotStorage for JsonSnapshotStorage {
    fn load(&self, user_id: &str) -> Result<Option<Snapshot>, CoreError> {
        let path = self.snapshot_path(user_id);
        if !path.exists() {
            return Ok(None);
        }
        load_snapshot_file(&path).map(Some)
    }

    fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), CoreError> {
        let path = self.snapshot_path(user_id);
        self.backup_existing(user_id, &path)?;
        write_json_atomic(&path, &wrap(snapshot))?;
        tracing::debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }
}

fn wrap(snapshot: &Snapshot) -> StoredSnapshot {
    StoredSnapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        saved_at: Utc::now(),
        snapshot: snapshot.clone(),
    }
}

/// Reads a wrapped snapshot, or a bare snapshot object written before versioning.
fn load_snapshot_file(path: &Path) -> Result<Snapshot, CoreError> {
    let value: serde_json::Value = read_json(path)?;
    let Some(version) = value.get("schema_version").and_then(|v| v.as_u64()) else {
        return serde_json::from_value(value).map_err(|err| CoreError::Serde(err.to_string()));
    };
    if version > u64::from(SNAPSHOT_SCHEMA_VERSION) {
        return Err(CoreError::Storage(format!(
            "snapshot at {} uses schema version {version}, newer than {SNAPSHOT_SCHEMA_VERSION}",
            path.display()
        )));
    }
    let stored: StoredSnapshot =
        serde_json::from_value(value).map_err(|err| CoreError::Serde(err.to_string()))?;
    Ok(stored.snapshot)
}
