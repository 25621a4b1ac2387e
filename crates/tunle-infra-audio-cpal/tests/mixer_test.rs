use pretty_assertions::assert_eq;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::Arc;
use tunle_infra_audio_cpal::mixer::{MixerCommand, MixerShared, VoiceMixer};
use tunle_infra_audio_cpal::write_interleaved;
use tunle_ports::audio::{AudioRenderCallback, VoiceId};
use tunle_ports::types::{DecodedBuffer, Volume01};

struct Rig {
    mixer: VoiceMixer,
    shared: Arc<MixerShared>,
    commands: Producer<MixerCommand>,
    finished: Consumer<VoiceId>,
}

fn rig(output_rate_hz: u32) -> Rig {
    let (commands, command_rx) = RingBuffer::new(16);
    let (finished_tx, finished) = RingBuffer::new(16);
    let shared = Arc::new(MixerShared::new());
    let mixer = VoiceMixer::new(shared.clone(), command_rx, finished_tx, output_rate_hz);
    Rig {
        mixer,
        shared,
        commands,
        finished,
    }
}

fn clip(rate: u32, samples: &[f32]) -> Arc<DecodedBuffer> {
    Arc::new(DecodedBuffer {
        sample_rate_hz: rate,
        left: samples.to_vec(),
        right: samples.to_vec(),
    })
}

fn render(rig: &mut Rig, frames: usize) -> Vec<f32> {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    rig.mixer.render(0, &mut left, &mut right);
    left
}

fn start(rig: &mut Rig, voice: u64, buffer: Arc<DecodedBuffer>, at_sample: u64) {
    assert!(rig
        .commands
        .push(MixerCommand::Start {
            voice: VoiceId(voice),
            buffer,
            at_sample,
        })
        .is_ok());
}

fn drain(rig: &mut Rig) -> Vec<VoiceId> {
    let mut out = Vec::new();
    while let Ok(voice) = rig.finished.pop() {
        out.push(voice);
    }
    out
}

#[test]
fn suspended_mixer_is_silent_and_its_clock_stands_still() {
    let mut rig = rig(48_000);
    start(&mut rig, 1, clip(48_000, &[0.5; 4]), 0);

    let out = render(&mut rig, 8);

    assert_eq!(out, vec![0.0; 8]);
    assert_eq!(rig.shared.sample_time(), 0);
    assert!(drain(&mut rig).is_empty());
}

#[test]
fn voice_plays_to_the_end_and_is_reported_once() {
    let mut rig = rig(48_000);
    rig.shared.set_running(true);
    start(&mut rig, 7, clip(48_000, &[0.5, 0.25, 0.5, 0.25]), 0);

    let out = render(&mut rig, 8);

    assert_eq!(out, vec![0.5, 0.25, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(rig.shared.sample_time(), 8);
    assert_eq!(drain(&mut rig), vec![VoiceId(7)]);

    render(&mut rig, 8);
    assert!(drain(&mut rig).is_empty());
    assert_eq!(rig.mixer.active_voices(), 0);
}

#[test]
fn stopped_voice_is_never_reported_finished() {
    let mut rig = rig(48_000);
    rig.shared.set_running(true);
    start(&mut rig, 1, clip(48_000, &[0.5; 16]), 0);
    render(&mut rig, 4);

    assert!(rig.commands.push(MixerCommand::Stop { voice: VoiceId(1) }).is_ok());
    let out = render(&mut rig, 32);

    assert_eq!(out, vec![0.0; 32]);
    assert!(drain(&mut rig).is_empty());
}

#[test]
fn scheduled_start_waits_for_its_sample() {
    let mut rig = rig(48_000);
    rig.shared.set_running(true);
    start(&mut rig, 1, clip(48_000, &[0.5; 2]), 3);

    let out = render(&mut rig, 6);

    assert_eq!(out, vec![0.0, 0.0, 0.0, 0.5, 0.5, 0.0]);
}

#[test]
fn lower_rate_clips_are_stretched_to_the_output_rate() {
    let mut rig = rig(48_000);
    rig.shared.set_running(true);
    start(&mut rig, 1, clip(24_000, &[0.0, 0.5]), 0);

    let out = render(&mut rig, 4);

    assert_eq!(out, vec![0.0, 0.25, 0.5, 0.5]);
}

#[test]
fn master_volume_scales_the_mix() {
    let mut rig = rig(48_000);
    rig.shared.set_running(true);
    rig.shared.set_master(Volume01::new(0.5));
    start(&mut rig, 1, clip(48_000, &[0.5; 2]), 0);
    start(&mut rig, 2, clip(48_000, &[0.25; 2]), 0);

    let out = render(&mut rig, 2);

    assert_eq!(out, vec![0.375, 0.375]);
}

#[test]
fn stereo_pair_is_interleaved_and_extra_channels_are_silent() {
    let mut data = vec![1.0_f32; 6];
    write_interleaved(&mut data, 3, &[0.5, -0.5], &[0.25, -0.25]);
    assert_eq!(data, vec![0.5, 0.25, 0.0, -0.5, -0.25, 0.0]);

    let mut mono = vec![0_i16; 1];
    write_interleaved(&mut mono, 1, &[1.0], &[1.0]);
    assert_eq!(mono, vec![i16::MAX]);
}
