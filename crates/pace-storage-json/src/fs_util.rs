use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

use pace_core::CoreError;

pub(crate) const JSON_EXTENSION: &str = "json";
pub(crate) const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;
const ID_HASH_BYTES: usize = 4;

/// File-name-safe form of a user id.
///
/// Ids compare case-insensitively after trimming. Ids made only of ASCII alphanumerics
/// and `_` map to themselves; any other id gets its unsafe characters replaced with `_`
/// plus a `-<hash>` suffix, so distinct ids never share a file.
pub(crate) fn canonical_name(name: &str) -> String {
    let key = name.trim().to_lowercase();
    let slug: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let readable = slug.chars().any(|c| c.is_ascii_alphanumeric());
    if readable && slug == key {
        return slug;
    }
    let base = if readable { slug.as_str() } else { "user" };
    let digest = Sha256::digest(key.as_bytes());
    format!("{base}-{}", hex::encode(&digest[..ID_HASH_BYTES]))
}

/// Reads the `YYYYMMDD_HHMMSS` stamp that follows `<prefix>_` in a backup file name.
pub(crate) fn parse_stamp(file_name: &str, prefix: &str) -> Option<NaiveDateTime> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('_')?;
    let stamp = rest.get(..STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// JSON files directly inside `dir`, sorted by name. A missing directory yields nothing.
pub(crate) fn json_files(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(JSON_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

/// Serializes `value` next to `path` and renames it into place.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|err| CoreError::Serde(err.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    let staged = PathBuf::from(staged);
    {
        let mut file = File::create(&staged)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&staged, path)?;
    Ok(())
}

/// Removes `path` if present. Returns whether a file was deleted.
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, CoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
