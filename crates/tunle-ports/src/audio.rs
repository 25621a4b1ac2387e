use crate::types::*;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
    #[error("context closed")]
    Closed,
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Audio callback: must be realtime-safe.
pub trait AudioRenderCallback: Send + 'static {
    fn render(&mut self, sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]);
}

/// One audio processing context. Voices are started against the context clock and reported
/// back through `drain_finished` once they play to the end; stopped voices are never reported.
pub trait AudioContextPort: Send {
    fn state(&self) -> ContextState;
    fn sample_rate_hz(&self) -> u32;
    /// Context clock in seconds; does not advance while suspended.
    fn current_time(&self) -> f64;

    fn resume(&mut self) -> Result<(), AudioError>;
    fn suspend(&mut self) -> Result<(), AudioError>;
    fn close(&mut self);

    fn start_voice(
        &mut self,
        buffer: Arc<DecodedBuffer>,
        at_secs: f64,
    ) -> Result<VoiceId, AudioError>;
    fn stop_voice(&mut self, voice: VoiceId) -> Result<(), AudioError>;
    fn drain_finished(&mut self) -> Vec<VoiceId>;

    fn set_master_volume(&mut self, volume: Volume01);
}

pub trait AudioBackendPort: Send + Sync {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError>;

    /// New contexts start suspended, like a page that has not seen a gesture yet.
    fn create_context(&self) -> Result<Box<dyn AudioContextPort>, AudioError>;
}
