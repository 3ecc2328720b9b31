//! Durable key-value slots: one for the task collection, one for the streak
//! record, one for the session credential. Reads recover from malformed
//! content by falling back to the empty value; a warning is logged and
//! startup continues.

use crate::error::AppError;
use crate::model::{Credential, StreakRecord, Task};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

const TASKS_FILE_NAME: &str = "tasks.json";
const STREAK_FILE_NAME: &str = "streak.json";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredTasks {
    schema_version: u32,
    tasks: Vec<Task>,
}

fn slot_path(env_var: &str, file_name: &str) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(env_var)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("daytasks").join(file_name))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("daytasks")
            .join(file_name))
    }
}

pub fn tasks_path() -> Result<PathBuf, AppError> {
    slot_path("DAYTASKS_STORE_PATH", TASKS_FILE_NAME)
}

pub fn streak_path() -> Result<PathBuf, AppError> {
    slot_path("DAYTASKS_STREAK_PATH", STREAK_FILE_NAME)
}

pub fn session_path() -> Result<PathBuf, AppError> {
    slot_path("DAYTASKS_SESSION_PATH", SESSION_FILE_NAME)
}

/// One-time hydration of the task collection. Missing or malformed state
/// yields an empty collection, never an error.
pub fn load_tasks(path: &Path) -> Vec<Task> {
    if !path.exists() {
        return Vec::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read task store");
            return Vec::new();
        }
    };

    match serde_json::from_str::<StoredTasks>(&content) {
        Ok(stored) if (1..=SCHEMA_VERSION).contains(&stored.schema_version) => stored.tasks,
        Ok(stored) => {
            tracing::warn!(
                path = %path.display(),
                schema_version = stored.schema_version,
                "unsupported task store schema, starting empty"
            );
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "malformed task store, starting empty");
            Vec::new()
        }
    }
}

/// Mirrors the full collection to the tasks slot. Skipped only when the
/// collection is empty and the slot has never been written, so a first run
/// does not leave an empty placeholder behind.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), AppError> {
    if tasks.is_empty() && !path.exists() {
        return Ok(());
    }

    let stored = StoredTasks {
        schema_version: SCHEMA_VERSION,
        tasks: tasks.to_vec(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    write_slot(path, &content)
}

pub fn load_streak(path: &Path) -> StreakRecord {
    if !path.exists() {
        return StreakRecord::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read streak record");
            return StreakRecord::default();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "malformed streak record, resetting");
        StreakRecord::default()
    })
}

pub fn save_streak(path: &Path, record: &StreakRecord) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(record)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    write_slot(path, &content)
}

pub fn load_credential(path: &Path) -> Option<Credential> {
    if !path.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read session credential");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(credential) => Some(credential),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "malformed session credential, ignoring");
            None
        }
    }
}

pub fn save_credential(path: &Path, credential: &Credential) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(credential)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    write_slot(path, &content)
}

pub fn clear_credential(path: &Path) -> Result<(), AppError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::io(err.to_string())),
    }
}

fn write_slot(path: &Path, content: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}
