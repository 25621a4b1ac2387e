use rtrb::{Consumer, Producer};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tunle_ports::audio::{AudioRenderCallback, VoiceId};
use tunle_ports::types::{DecodedBuffer, SampleTime, Volume01};

/// Sent from the context to the audio thread.
pub enum MixerCommand {
    Start {
        voice: VoiceId,
        buffer: Arc<DecodedBuffer>,
        at_sample: SampleTime,
    },
    Stop {
        voice: VoiceId,
    },
    StopAll,
}

/// State read by the context and written by the audio thread, or the other way round.
#[derive(Debug)]
pub struct MixerShared {
    running: AtomicBool,
    sample_time: AtomicU64,
    master: AtomicU32,
}

impl MixerShared {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            sample_time: AtomicU64::new(0),
            master: AtomicU32::new(1.0_f32.to_bits()),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_master(&self, volume: Volume01) {
        self.master.store(volume.get().to_bits(), Ordering::Relaxed);
    }

    pub fn master(&self) -> f32 {
        f32::from_bits(self.master.load(Ordering::Relaxed))
    }

    /// Frames rendered while running.
    pub fn sample_time(&self) -> SampleTime {
        self.sample_time.load(Ordering::Relaxed)
    }
}

impl Default for MixerShared {
    fn default() -> Self {
        Self::new()
    }
}

struct Voice {
    id: VoiceId,
    buffer: Arc<DecodedBuffer>,
    start_sample: SampleTime,
    position: f64,
    step: f64,
    done: bool,
}

impl Voice {
    fn frame_at(&self, position: f64) -> Option<(f32, f32)> {
        let frames = self.buffer.frames();
        let index = position as usize;
        if index >= frames {
            return None;
        }
        let frac = (position - index as f64) as f32;
        let next = (index + 1).min(frames - 1);
        let l = &self.buffer.left;
        let r = &self.buffer.right;
        Some((
            l[index] + (l[next] - l[index]) * frac,
            r[index] + (r[next] - r[index]) * frac,
        ))
    }
}

/// Sums the active voices into the output. Holds its own clock, which stands still while
/// the context is suspended.
pub struct VoiceMixer {
    shared: Arc<MixerShared>,
    commands: Consumer<MixerCommand>,
    finished: Producer<VoiceId>,
    voices: Vec<Voice>,
    unreported: Vec<VoiceId>,
    output_rate_hz: u32,
    clock: SampleTime,
    limiter_gain: f32,
}

impl VoiceMixer {
    pub fn new(
        shared: Arc<MixerShared>,
        commands: Consumer<MixerCommand>,
        finished: Producer<VoiceId>,
        output_rate_hz: u32,
    ) -> Self {
        Self {
            shared,
            commands,
            finished,
            voices: Vec::with_capacity(64),
            unreported: Vec::with_capacity(64),
            output_rate_hz,
            clock: 0,
            limiter_gain: 1.0,
        }
    }

    pub fn set_output_rate(&mut self, output_rate_hz: u32) {
        self.output_rate_hz = output_rate_hz;
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                MixerCommand::Start {
                    voice,
                    buffer,
                    at_sample,
                } => {
                    let step = if self.output_rate_hz == 0 {
                        1.0
                    } else {
                        buffer.sample_rate_hz as f64 / self.output_rate_hz as f64
                    };
                    self.voices.push(Voice {
                        id: voice,
                        buffer,
                        start_sample: at_sample,
                        position: 0.0,
                        step,
                        done: false,
                    });
                }
                MixerCommand::Stop { voice } => {
                    self.voices.retain(|v| v.id != voice);
                }
                MixerCommand::StopAll => self.voices.clear(),
            }
        }
    }

    fn report_finished(&mut self) {
        while let Some(&voice) = self.unreported.first() {
            if self.finished.push(voice).is_err() {
                break;
            }
            self.unreported.remove(0);
        }
    }

    fn apply_limiter(&mut self, out_l: &mut [f32], out_r: &mut [f32]) {
        let limit = 0.98_f32;
        let peak = out_l
            .iter()
            .chain(out_r.iter())
            .fold(0.0_f32, |peak, s| peak.max(s.abs()));

        let target_gain = if peak > limit { limit / peak } else { 1.0 };
        let coeff = if target_gain < self.limiter_gain {
            0.25
        } else {
            0.01
        };
        self.limiter_gain =
            (self.limiter_gain + coeff * (target_gain - self.limiter_gain)).clamp(0.0, 1.0);

        if self.limiter_gain < 0.999 {
            for (l, r) in out_l.iter_mut().zip(out_r.iter_mut()) {
                *l *= self.limiter_gain;
                *r *= self.limiter_gain;
            }
        }
    }
}

impl AudioRenderCallback for VoiceMixer {
    fn render(&mut self, _sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = out_l.len().min(out_r.len());
        out_l.fill(0.0);
        out_r.fill(0.0);

        self.apply_commands();
        if !self.shared.running() {
            self.report_finished();
            return;
        }

        let clock = self.clock;
        for voice in self.voices.iter_mut() {
            for i in 0..frames {
                if clock + (i as u64) < voice.start_sample {
                    continue;
                }
                match voice.frame_at(voice.position) {
                    Some((l, r)) => {
                        out_l[i] += l;
                        out_r[i] += r;
                        voice.position += voice.step;
                    }
                    None => {
                        voice.done = true;
                        break;
                    }
                }
            }
        }
        let unreported = &mut self.unreported;
        self.voices.retain(|voice| {
            if voice.done {
                unreported.push(voice.id);
            }
            !voice.done
        });

        let master = self.shared.master();
        for (l, r) in out_l[..frames].iter_mut().zip(out_r[..frames].iter_mut()) {
            *l *= master;
            *r *= master;
        }
        self.apply_limiter(&mut out_l[..frames], &mut out_r[..frames]);

        self.clock = clock + frames as u64;
        self.shared.sample_time.store(self.clock, Ordering::Relaxed);
        self.report_finished();
    }
}
