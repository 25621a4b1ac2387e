use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_master_volume() -> Volume01 {
    Volume01::new(0.8)
}

fn default_asset_root() -> String {
    "assets".to_string()
}

fn default_melody_root() -> String {
    "melodies".to_string()
}

fn default_feedback_window_ms() -> u64 {
    1000
}

fn default_failure_cue_delay_ms() -> u64 {
    500
}

fn default_failed_advance_delay_ms() -> u64 {
    3000
}

fn default_session_end_delay_ms() -> u64 {
    2000
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub selected_audio_out: Option<DeviceId>,
    pub audio_buffer_size_frames: Option<u32>,
    #[serde(default = "default_master_volume")]
    pub master_volume: Volume01,
    /// Scores are only recorded when a user is signed in.
    pub user_id: Option<String>,
    /// Directory holding `instrument/`, `cues/` and `bundled/` clips.
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
    /// Directory holding one `YYYY-MM-DD` folder per published melody.
    #[serde(default = "default_melody_root")]
    pub melody_root: String,
    #[serde(default = "default_feedback_window_ms")]
    pub feedback_window_ms: u64,
    #[serde(default = "default_failure_cue_delay_ms")]
    pub failure_cue_delay_ms: u64,
    #[serde(default = "default_failed_advance_delay_ms")]
    pub failed_advance_delay_ms: u64,
    #[serde(default = "default_session_end_delay_ms")]
    pub session_end_delay_ms: u64,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            selected_audio_out: None,
            audio_buffer_size_frames: None,
            master_volume: default_master_volume(),
            user_id: None,
            asset_root: default_asset_root(),
            melody_root: default_melody_root(),
            feedback_window_ms: default_feedback_window_ms(),
            failure_cue_delay_ms: default_failure_cue_delay_ms(),
            failed_advance_delay_ms: default_failed_advance_delay_ms(),
            session_end_delay_ms: default_session_end_delay_ms(),
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
