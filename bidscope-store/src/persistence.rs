//! File persistence helpers.
//!
//! Everything bidscope keeps on disk is pretty-printed JSON, written
//! atomically and readable by the owner only.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Directory name under the platform config and data directories.
pub const APP_DIR: &str = "bidscope";

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - Linux: `~/.config/bidscope`
/// - macOS: `~/Library/Application Support/bidscope`
/// - Windows: `%APPDATA%\bidscope`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Returns the default data directory, where datasets and employees live.
///
/// - Linux: `~/.local/share/bidscope`
/// - macOS: `~/Library/Application Support/bidscope`
/// - Windows: `%APPDATA%\bidscope`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(default_config_dir, |d| d.join(APP_DIR))
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// Returns the default directory for saved datasets.
pub fn default_datasets_dir() -> PathBuf {
    default_data_dir().join("datasets")
}

/// Returns the default employees file path.
pub fn default_employees_path() -> PathBuf {
    default_data_dir().join("employees.json")
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Restricts a file (0o600) or directory (0o700) to its owner.
#[cfg(unix)]
async fn restrict_to_owner(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(mode);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates a directory (and its parents) if missing, owner-only.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        restrict_to_owner(path, 0o700).await?;
    }
    Ok(())
}

/// Saves data to a JSON file with secure permissions.
///
/// Creates the parent directory if needed and writes through a temp file
/// followed by a rename, so readers never see a half-written file.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    restrict_to_owner(&temp_path, 0o600).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), bytes = json.len(), "Saved JSON file");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;

    debug!(path = %path.display(), "Loaded JSON file");
    Ok(data)
}

/// Loads data from a JSON file, returning the default if it is missing or
/// unreadable. Only parse failures are logged.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(e) => {
            if !matches!(e, StoreError::Io(_)) {
                warn!(path = %path.display(), error = %e, "Failed to load, using defaults");
            }
            T::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
