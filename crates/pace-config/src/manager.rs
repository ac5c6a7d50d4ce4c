use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use pace_domain::note_slug;

use crate::{Config, ConfigError};

const CONFIG_FILE_NAME: &str = "config.json";
const JSON_EXTENSION: &str = "json";
const BACKUP_PREFIX: &str = "config";
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M";

/// Loads, saves, and snapshots `config.json`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
        }
    }

    /// Lays out `<base>/config/config.json` and `<base>/config/backups/`.
    pub fn with_base_dir(base: &Path) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        let backups_dir = config_dir.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE_NAME), backups_dir))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Reads the stored config, or the defaults when none has been saved.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no config file; using defaults");
            return Ok(Config::default());
        }
        let config = read_config(&self.config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates and writes the config through a temporary file.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let staged = staging_path(&self.config_path);
        write_file(&staged, &to_json(config)?)?;
        fs::rename(&staged, &self.config_path)?;
        tracing::debug!(path = %self.config_path.display(), "saved config");
        Ok(())
    }

    /// Writes a timestamped copy of `config` and returns the backup file name.
    ///
    /// Older backups beyond `config.backup_retention` are removed.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        let stamp = Local::now().format(BACKUP_STAMP_FORMAT);
        let name = match note.and_then(note_slug) {
            Some(label) => format!("{BACKUP_PREFIX}_{stamp}_{label}.{JSON_EXTENSION}"),
            None => format!("{BACKUP_PREFIX}_{stamp}.{JSON_EXTENSION}"),
        };
        write_file(&self.backups_dir.join(&name), &to_json(config)?)?;
        self.prune(config.backup_retention.max(1))?;
        tracing::info!(backup = %name, "created config backup");
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        let path = self.backups_dir.join(backup_name);
        if !path.is_file() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("configuration backup `{backup_name}` not found"),
            )));
        }
        let config = read_config(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(JSON_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort_by(|a, b| {
            Reverse(backup_stamp(a))
                .cmp(&Reverse(backup_stamp(b)))
                .then_with(|| b.cmp(a))
        });
        Ok(names)
    }

    fn prune(&self, keep: usize) -> Result<(), ConfigError> {
        for stale in self.list_backups()?.into_iter().skip(keep) {
            if let Err(err) = fs::remove_file(self.backups_dir.join(&stale)) {
                tracing::warn!(backup = %stale, %err, "failed to prune config backup");
            }
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn to_json(config: &Config) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))
}

/// Parses the `YYYYMMDD_HHMM` stamp that follows the `config_` prefix.
fn backup_stamp(name: &str) -> Option<NaiveDateTime> {
    let rest = name.strip_prefix(BACKUP_PREFIX)?.strip_prefix('_')?;
    let stamp = rest.get(..13)?;
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M").ok()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_stamp_reads_prefix_and_ignores_note() {
        let stamp = backup_stamp("config_20250114_0930_before-rollover.json").unwrap();
        assert_eq!(stamp.format("%Y-%m-%d %H:%M").to_string(), "2025-01-14 09:30");
        assert!(backup_stamp("notes.json").is_none());
    }
}
