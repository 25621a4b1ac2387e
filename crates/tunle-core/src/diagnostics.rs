use crate::ipc::SessionSnapshot;
use crate::sound_cache::CacheSnapshot;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tunle_ports::storage::{SettingsDto, StorageError};
use tunle_ports::types::AudioOutputDevice;

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct RecentNotes {
    notes: Vec<u8>,
}

pub struct DiagnosticsInput<'a> {
    pub settings: &'a SettingsDto,
    pub audio_outputs: Vec<AudioOutputDevice>,
    pub cache: CacheSnapshot,
    pub session: SessionSnapshot,
    pub recent_notes: Vec<u8>,
}

/// Writes one JSON file per section into `dir`, creating it if needed.
pub fn export_diagnostics(dir: &Path, input: DiagnosticsInput<'_>) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "Tunle".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let platform = PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("platform.json"), &platform)?;
    write_json(&dir.join("settings.json"), input.settings)?;
    write_json(&dir.join("audio_outputs.json"), &input.audio_outputs)?;
    write_json(&dir.join("sound_cache.json"), &input.cache)?;
    write_json(&dir.join("session.json"), &input.session)?;
    write_json(
        &dir.join("recent_notes.json"),
        &RecentNotes {
            notes: input.recent_notes,
        },
    )?;

    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
