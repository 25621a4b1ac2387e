pub mod mixer;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedStreamConfigRange,
};
use mixer::{MixerCommand, MixerShared, VoiceMixer};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tunle_ports::audio::{
    AudioBackendPort, AudioContextPort, AudioError, AudioRenderCallback, ContextState, VoiceId,
};
use tunle_ports::types::{AudioConfig, AudioOutputDevice, DecodedBuffer, DeviceId, Volume01};

const COMMAND_QUEUE: usize = 256;
const FINISHED_QUEUE: usize = 256;

/// Opens one output stream per audio context on the selected (or default) device.
pub struct CpalAudioBackend {
    device_id: Option<DeviceId>,
    config: AudioConfig,
}

struct SelectedStreamConfig {
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl CpalAudioBackend {
    pub fn new() -> Self {
        Self {
            device_id: None,
            config: AudioConfig::default(),
        }
    }

    pub fn with_device(device_id: Option<DeviceId>, config: AudioConfig) -> Self {
        Self { device_id, config }
    }

    fn list_devices_from_host(
        host: &cpal::Host,
    ) -> Result<Vec<(DeviceId, cpal::Device)>, AudioError> {
        let host_id = format!("{:?}", host.id());
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| "Unknown Output".to_string());
                (DeviceId(format!("cpal:{host_id}:{index}:{name}")), device)
            })
            .collect())
    }

    fn open_device(
        host: &cpal::Host,
        device_id: Option<&DeviceId>,
    ) -> Result<cpal::Device, AudioError> {
        match device_id {
            Some(wanted) => Self::list_devices_from_host(host)?
                .into_iter()
                .find(|(id, _)| id == wanted)
                .map(|(_, device)| device)
                .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string())),
            None => host
                .default_output_device()
                .ok_or_else(|| AudioError::DeviceUnavailable("no default output".to_string())),
        }
    }

    fn select_stream_config(
        device: &cpal::Device,
        desired: AudioConfig,
    ) -> Result<SelectedStreamConfig, AudioError> {
        let mut supported = device
            .supported_output_configs()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        let chosen = select_supported_config(&mut supported, desired)?;
        let sample_format = chosen.sample_format();
        let mut config = chosen.config();
        config.buffer_size = match desired.buffer_size_frames {
            Some(frames) => BufferSize::Fixed(frames),
            None => BufferSize::Default,
        };

        Ok(SelectedStreamConfig {
            config,
            sample_format,
        })
    }
}

impl Default for CpalAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackendPort for CpalAudioBackend {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        let host = cpal::default_host();
        let devices = Self::list_devices_from_host(&host)?;

        Ok(devices
            .into_iter()
            .filter_map(|(id, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| "Unknown Output".to_string());
                let default_config = device.default_output_config().ok()?;
                Some(AudioOutputDevice {
                    id,
                    name,
                    default_config: AudioConfig {
                        sample_rate_hz: default_config.sample_rate().0,
                        channels: default_config.channels(),
                        buffer_size_frames: None,
                    },
                })
            })
            .collect())
    }

    fn create_context(&self) -> Result<Box<dyn AudioContextPort>, AudioError> {
        let (command_tx, command_rx) = RingBuffer::<MixerCommand>::new(COMMAND_QUEUE);
        let (finished_tx, finished_rx) = RingBuffer::<VoiceId>::new(FINISHED_QUEUE);
        let shared = Arc::new(MixerShared::new());
        let mut voice_mixer = VoiceMixer::new(shared.clone(), command_rx, finished_tx, 0);

        let device_id = self.device_id.clone();
        let desired = self.config;
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<u32, AudioError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join_handle = thread::spawn(move || {
            let host = cpal::default_host();
            let opened = Self::open_device(&host, device_id.as_ref()).and_then(|device| {
                let selected = Self::select_stream_config(&device, desired)?;
                Ok((device, selected))
            });
            let (device, selected) = match opened {
                Ok(pair) => pair,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            let sample_rate_hz = selected.config.sample_rate.0;
            voice_mixer.set_output_rate(sample_rate_hz);

            let stream = match selected.sample_format {
                SampleFormat::F32 => build_stream::<f32, _>(&device, &selected.config, voice_mixer),
                SampleFormat::I16 => build_stream::<i16, _>(&device, &selected.config, voice_mixer),
                SampleFormat::U16 => build_stream::<u16, _>(&device, &selected.config, voice_mixer),
                other => Err(AudioError::UnsupportedConfig(format!("{other:?}"))),
            };
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            if let Err(err) = stream.play() {
                let _ = ready_tx.send(Err(AudioError::Backend(err.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(sample_rate_hz));
            let _ = stop_rx.recv();
            drop(stream);
        });

        let sample_rate_hz = ready_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))??;
        log::info!(target: "audio::cpal", "output stream open at {} Hz", sample_rate_hz);

        Ok(Box::new(CpalAudioContext {
            shared,
            commands: command_tx,
            finished: finished_rx,
            sample_rate_hz,
            next_voice: 1,
            state: ContextState::Suspended,
            stop_tx,
            join_handle: Some(join_handle),
        }))
    }
}

/// One open stream. Starts suspended: the mixer renders silence until `resume`.
pub struct CpalAudioContext {
    shared: Arc<MixerShared>,
    commands: Producer<MixerCommand>,
    finished: Consumer<VoiceId>,
    sample_rate_hz: u32,
    next_voice: u64,
    state: ContextState,
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl CpalAudioContext {
    fn send(&mut self, command: MixerCommand) -> Result<(), AudioError> {
        self.commands
            .push(command)
            .map_err(|_| AudioError::Backend("mixer command queue full".to_string()))
    }
}

impl AudioContextPort for CpalAudioContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn current_time(&self) -> f64 {
        self.shared.sample_time() as f64 / self.sample_rate_hz.max(1) as f64
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::Closed);
        }
        self.shared.set_running(true);
        self.state = ContextState::Running;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::Closed);
        }
        self.shared.set_running(false);
        self.state = ContextState::Suspended;
        Ok(())
    }

    fn close(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        self.shared.set_running(false);
        let _ = self.commands.push(MixerCommand::StopAll);
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                log::error!(target: "audio::cpal", "audio thread panicked");
            }
        }
        self.state = ContextState::Closed;
    }

    fn start_voice(
        &mut self,
        buffer: Arc<DecodedBuffer>,
        at_secs: f64,
    ) -> Result<VoiceId, AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::Closed);
        }
        let voice = VoiceId(self.next_voice);
        self.next_voice += 1;
        let at_sample = (at_secs.max(0.0) * self.sample_rate_hz as f64).round() as u64;
        self.send(MixerCommand::Start {
            voice,
            buffer,
            at_sample,
        })?;
        Ok(voice)
    }

    fn stop_voice(&mut self, voice: VoiceId) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Ok(());
        }
        self.send(MixerCommand::Stop { voice })
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let mut finished = Vec::new();
        while let Ok(voice) = self.finished.pop() {
            finished.push(voice);
        }
        finished
    }

    fn set_master_volume(&mut self, volume: Volume01) {
        self.shared.set_master(volume);
    }
}

impl Drop for CpalAudioContext {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_stream<T, C>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut cb: C,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
    C: AudioRenderCallback,
{
    let channels = config.channels as usize;
    let initial_frames = match config.buffer_size {
        BufferSize::Fixed(frames) => frames as usize,
        BufferSize::Default => 8192,
    };
    let mut left = vec![0.0_f32; initial_frames];
    let mut right = vec![0.0_f32; initial_frames];
    let mut sample_time: u64 = 0;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                if frames > left.len() {
                    left.resize(frames, 0.0);
                    right.resize(frames, 0.0);
                }
                cb.render(sample_time, &mut left[..frames], &mut right[..frames]);
                write_interleaved(data, channels, &left[..frames], &right[..frames]);
                sample_time = sample_time.saturating_add(frames as u64);
            },
            |err| log::error!(target: "audio::cpal", "stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Backend(e.to_string()))
}

fn select_supported_config(
    supported: &mut dyn Iterator<Item = SupportedStreamConfigRange>,
    desired: AudioConfig,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let mut best: Option<cpal::SupportedStreamConfig> = None;
    let mut best_score: i32 = -1;

    for config_range in supported {
        if config_range.channels() != desired.channels {
            continue;
        }
        let min = config_range.min_sample_rate().0;
        let max = config_range.max_sample_rate().0;
        if desired.sample_rate_hz < min || desired.sample_rate_hz > max {
            continue;
        }

        let score = match config_range.sample_format() {
            SampleFormat::F32 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::U16 => 1,
            _ => 0,
        };
        if score > best_score {
            best = Some(config_range.with_sample_rate(SampleRate(desired.sample_rate_hz)));
            best_score = score;
        }
    }

    best.ok_or_else(|| AudioError::UnsupportedConfig("no matching stream config".to_string()))
}

/// Writes the stereo pair into the first two channels; mono outputs get the average.
pub fn write_interleaved<T>(data: &mut [T], channels: usize, left: &[f32], right: &[f32])
where
    T: SizedSample + FromSample<f32>,
{
    if channels == 0 {
        return;
    }
    for (frame, out) in data.chunks_mut(channels).enumerate() {
        let l = left.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        let r = right.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        match out {
            [mono] => *mono = T::from_sample((l + r) * 0.5),
            [first, second, rest @ ..] => {
                *first = T::from_sample(l);
                *second = T::from_sample(r);
                for sample in rest {
                    *sample = T::EQUILIBRIUM;
                }
            }
            [] => {}
        }
    }
}
