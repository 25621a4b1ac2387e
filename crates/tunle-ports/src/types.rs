use serde::{Deserialize, Serialize};
use std::fmt;

pub type SampleTime = u64; // audio sample index, monotonic while the context runs

/// Number of keys on the virtual instrument (`n1..n8`).
pub const INSTRUMENT_NOTE_COUNT: u8 = 8;
/// Every melody-owned buffer key starts with this; they are evicted together when the day changes.
pub const MELODY_KEY_PREFIX: &str = "melody";

pub fn instrument_key(note: u8) -> String {
    format!("n{note}")
}

/// Key for bar `index` (0-based) of the loaded melody.
pub fn melody_bar_key(index: usize) -> String {
    format!("{MELODY_KEY_PREFIX}{}", index + 1)
}

pub fn melody_full_key() -> String {
    format!("{MELODY_KEY_PREFIX}full")
}

pub fn is_melody_key(key: &str) -> bool {
    key.starts_with(MELODY_KEY_PREFIX)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioOutputDevice {
    pub id: DeviceId,
    pub name: String,
    pub default_config: AudioConfig,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16, // fixed 2
    pub buffer_size_frames: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            channels: 2,
            buffer_size_frames: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Volume01(pub f32);

impl Volume01 {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

/// Decoded, ready-to-play stereo clip.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedBuffer {
    pub sample_rate_hz: u32,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl DecodedBuffer {
    pub fn frames(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate_hz as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Host page events the lifecycle manager reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PlatformEvent {
    TouchStart,
    TouchEnd,
    Click,
    KeyDown,
    VisibilityChanged { visibility: Visibility },
    /// `persisted` is true when the page comes back from the history cache.
    PageShow { persisted: bool },
}

impl PlatformEvent {
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            PlatformEvent::TouchStart
                | PlatformEvent::TouchEnd
                | PlatformEvent::Click
                | PlatformEvent::KeyDown
        )
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
