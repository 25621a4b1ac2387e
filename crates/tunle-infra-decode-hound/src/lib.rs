use std::io::Cursor;
use tunle_ports::assets::{DecodeError, SoundDecoderPort};
use tunle_ports::types::DecodedBuffer;

/// Decodes RIFF/WAVE clips into stereo `f32` buffers.
///
/// Mono clips are copied to both sides; channels past the second are dropped.
#[derive(Default)]
pub struct HoundWavDecoder;

impl HoundWavDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn decode_error(err: hound::Error) -> DecodeError {
    match err {
        hound::Error::FormatError(msg) => DecodeError::Corrupt(msg.to_string()),
        hound::Error::IoError(e) => DecodeError::Corrupt(e.to_string()),
        hound::Error::Unsupported => DecodeError::UnsupportedFormat("unsupported wav".to_string()),
        other => DecodeError::UnsupportedFormat(other.to_string()),
    }
}

fn read_samples<R: std::io::Read>(
    reader: hound::WavReader<R>,
) -> Result<Vec<f32>, DecodeError> {
    let spec = reader.spec();
    match spec.sample_format {
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "{} bits per sample",
                    spec.bits_per_sample
                )));
            }
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val).map_err(decode_error))
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(decode_error))
            .collect(),
    }
}

impl SoundDecoderPort for HoundWavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode_error)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(DecodeError::Corrupt("zero channels".to_string()));
        }
        // A zero rate would never advance through the clip.
        if spec.sample_rate == 0 {
            return Err(DecodeError::Corrupt("zero sample rate".to_string()));
        }

        let samples = read_samples(reader)?;
        let frames = samples.len() / channels;
        if frames == 0 {
            return Err(DecodeError::Empty);
        }

        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }

        log::trace!(
            target: "decode",
            "decoded {} frames at {} Hz ({} ch)",
            frames,
            spec.sample_rate,
            channels
        );
        Ok(DecodedBuffer {
            sample_rate_hz: spec.sample_rate,
            left,
            right,
        })
    }
}
