use crate::{read_json, write_json, JsonError};
use std::path::PathBuf;
use tunle_ports::storage::{SettingsDto, StorageError, StoragePort};

pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("Tunle"))
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    fn settings_path(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { base_dir }
    }
}

fn storage_error(err: JsonError) -> StorageError {
    match err {
        JsonError::Io(e) => StorageError::Io(e.to_string()),
        JsonError::Serde(e) => StorageError::Serde(e.to_string()),
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(SettingsDto::default());
        }
        read_json(&path).map_err(storage_error)
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        write_json(&self.settings_path(), s).map_err(storage_error)?;
        log::debug!(target: "storage", "settings saved to {}", self.settings_path().display());
        Ok(())
    }
}
