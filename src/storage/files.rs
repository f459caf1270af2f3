//! JSON file helpers shared by snapshots, activity logs and asset logs.

use crate::core::{Result, VaultError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Reads and parses a JSON file, returning `None` if it doesn't exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(VaultError::IoError(format!(
                "read {}: {}",
                path.display(),
                err
            )));
        }
    };

    let value = serde_json::from_slice::<T>(&bytes).map_err(|err| {
        VaultError::Serialization(format!("parse {}: {}", path.display(), err))
    })?;
    Ok(Some(value))
}

/// Writes pretty JSON to a temporary file and atomically renames it over
/// the target path.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| VaultError::IoError(err.to_string()))?;
    }

    let json = serde_json::to_vec_pretty(value)
        .map_err(|err| VaultError::Serialization(format!("serialize {}: {}", path.display(), err)))?;

    let tmp_path = path.with_extension("json.tmp");
    write_synced(&tmp_path, &json).await?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|err| VaultError::IoError(format!("rename {}: {}", path.display(), err)))?;
    Ok(())
}

/// Writes `bytes` to `path` and syncs file data and metadata to disk
/// before returning.
pub async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .await
        .map_err(|err| VaultError::IoError(format!("create {}: {}", path.display(), err)))?;
    file.write_all(bytes)
        .await
        .map_err(|err| VaultError::IoError(format!("write {}: {}", path.display(), err)))?;
    file.flush()
        .await
        .map_err(|err| VaultError::IoError(format!("flush {}: {}", path.display(), err)))?;
    file.sync_all()
        .await
        .map_err(|err| VaultError::IoError(format!("sync {}: {}", path.display(), err)))?;
    Ok(())
}

/// Lists the file names in `dir`. A missing directory is empty.
pub async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(VaultError::IoError(err.to_string())),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Lists the sub-directory names in `dir`. A missing directory is empty.
pub async fn list_dir_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(VaultError::IoError(err.to_string())),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
