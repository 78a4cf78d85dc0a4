//! Item store: durable per-item file persistence.
//!
//! One file per item at `<dir>/m:<id>`, RON-encoded, file mode `0600`,
//! directory mode `0700`. Writes go through a temp-file-then-rename
//! so a crash mid-write never corrupts the previous valid content.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::StoreError;
use crate::item::{self, Item};

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Ensures the queue directory exists with mode `0700`.
pub async fn ensure_directory(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).await?;
    set_dir_permissions(dir).await?;
    Ok(())
}

#[cfg(unix)]
async fn set_dir_permissions(dir: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(DIR_MODE);
    fs::set_permissions(dir, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_dir_permissions(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
async fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(FILE_MODE);
    fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[must_use]
pub fn item_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(item::file_name_for(id))
}

/// Serializes `item` and atomically replaces its file under `dir`.
///
/// Write-to-temp-then-rename: the temp file is written and fsynced, then
/// renamed over the final path, so a crash mid-write leaves the previous
/// valid file (or nothing, on first write) intact rather than a partial one.
pub async fn write_item(dir: &Path, item: &Item) -> Result<(), StoreError> {
    let final_path = item_path(dir, &item.id);
    let tmp_path = dir.join(format!(".{}.tmp", item.file_name()));

    let encoded = ron::ser::to_string_pretty(item, ron::ser::PrettyConfig::default())?;

    fs::write(&tmp_path, encoded.as_bytes()).await?;
    set_file_permissions(&tmp_path).await?;
    fs::rename(&tmp_path, &final_path).await?;

    Ok(())
}

/// Parses an item from its on-disk file.
pub async fn read_item(path: &Path) -> Result<Item, StoreError> {
    let text = fs::read_to_string(path).await?;
    let item: Item = ron::from_str(&text)?;
    Ok(item)
}

/// Unlinks an item's file. Logged on error by the caller, never propagated:
/// removal is best-effort and idempotent.
pub async fn remove_item_file(dir: &Path, id: &str) -> std::io::Result<()> {
    let path = item_path(dir, id);
    match fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Lists every file in `dir` that matches the `m:<id>` naming convention.
/// Anything else (stray temp files, operator notes, etc.) is ignored.
pub async fn list_item_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if item::id_from_file_name(name).is_some() {
            files.push(entry.path());
        }
    }

    Ok(files)
}
