//! # WAV Export
//!
//! Renders PCM via [`crate::render::render_pcm`] and writes it with `hound`,
//! which already owns the RIFF/WAVE header and multi-bit-depth packing; this
//! module only needs to convert floats to the asymmetric integer range each
//! bit depth supports (`-1.0 -> MIN`, `+1.0 -> MAX`).

use crate::error::{GbscoreError, Result, Warning};
use crate::render::{render_pcm, ChannelCount, RenderOptions};
use crate::resolver::ResolvedSong;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    fn bits(self) -> u16 {
        match self {
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }

    fn range(self) -> (i64, i64) {
        match self {
            BitDepth::Sixteen => (i16::MIN as i64, i16::MAX as i64),
            BitDepth::TwentyFour => (-(1i64 << 23), (1i64 << 23) - 1),
            BitDepth::ThirtyTwo => (i32::MIN as i64, i32::MAX as i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavOptions {
    pub bit_depth: BitDepth,
    pub sample_rate: u32,
    pub channels: ChannelCount,
}

impl Default for WavOptions {
    fn default() -> Self {
        Self {
            bit_depth: BitDepth::Sixteen,
            sample_rate: 44_100,
            channels: ChannelCount::Mono,
        }
    }
}

fn scale_sample(sample: f32, depth: BitDepth) -> i32 {
    let s = sample.clamp(-1.0, 1.0) as f64;
    let (min, max) = depth.range();
    let scaled = if s < 0.0 { s * -(min as f64) } else { s * max as f64 };
    scaled.round().clamp(min as f64, max as f64) as i32
}

/// Render `song` and write it as a WAV file in memory, returning the encoded
/// bytes alongside any rendering warnings.
pub fn export_wav(
    song: &ResolvedSong,
    render_options: &RenderOptions,
    wav_options: &WavOptions,
) -> Result<(Vec<u8>, Vec<Warning>)> {
    let mut opts = render_options.clone();
    opts.sample_rate = wav_options.sample_rate;
    opts.channels = wav_options.channels;
    let (buffer, warnings) = render_pcm(song, &opts);

    let spec = hound::WavSpec {
        channels: match wav_options.channels {
            ChannelCount::Mono => 1,
            ChannelCount::Stereo => 2,
        },
        sample_rate: wav_options.sample_rate,
        bits_per_sample: wav_options.bit_depth.bits(),
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| GbscoreError::Export { format: "wav", message: e.to_string() })?;
        for sample in &buffer {
            let scaled = scale_sample(*sample, wav_options.bit_depth);
            writer
                .write_sample(scaled)
                .map_err(|e| GbscoreError::Export { format: "wav", message: e.to_string() })?;
        }
        writer
            .finalize()
            .map_err(|e| GbscoreError::Export { format: "wav", message: e.to_string() })?;
    }
    Ok((cursor.into_inner(), warnings))
}
