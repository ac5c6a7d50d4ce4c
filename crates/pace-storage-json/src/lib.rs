//! pace-storage-json
//!
//! Filesystem JSON implementations of the snapshot and saved-plan collaborators.

mod fs_util;
pub mod plan_store;
pub mod snapshot_store;

use std::path::{Path, PathBuf};

pub use plan_store::JsonPlanStore;
pub use snapshot_store::{JsonSnapshotStorage, StoredSnapshot, SNAPSHOT_SCHEMA_VERSION};

/// Directory layout under a single data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub snapshot_root: PathBuf,
    pub backup_root: PathBuf,
    pub plan_root: PathBuf,
}

impl StoragePaths {
    /// `<root>/snapshots`, `<root>/backups`, and `<root>/plans`.
    pub fn from_data_root(root: &Path) -> Self {
        Self {
            snapshot_root: root.join("snapshots"),
            backup_root: root.join("backups"),
            plan_root: root.join("plans"),
        }
    }
}
