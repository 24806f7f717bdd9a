//! Black-box tests for WAV export (C5.1).

use gbscore::{compile, export_wav, RenderOptions, WavOptions};
use pretty_assertions::assert_eq;

#[test]
fn exported_wav_carries_riff_wave_headers() {
    let (song, _) = compile("pat A = C4 D4\nchannel 1 => pat A\n").unwrap();
    let (bytes, _) = export_wav(&song, &RenderOptions::default(), &WavOptions::default()).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
}

#[test]
fn silent_song_exports_without_error() {
    let (song, _) = compile("pat A = . . .\nchannel 1 => pat A\n").unwrap();
    let (bytes, _) = export_wav(&song, &RenderOptions::default(), &WavOptions::default()).unwrap();
    assert!(bytes.len() > 44); // header + at least some sample frames
}

#[test]
fn sixteen_bit_export_uses_fmt_chunk_bit_depth() {
    let (song, _) = compile("inst lead type=pulse1\npat A = C4\nchannel 1 => inst lead pat A\n").unwrap();
    let mut opts = WavOptions::default();
    opts.bit_depth = gbscore::BitDepth::Sixteen;
    let (bytes, _) = export_wav(&song, &RenderOptions::default(), &opts).unwrap();
    // bits-per-sample field sits at byte offset 34 in the canonical WAV header.
    let bits = u16::from_le_bytes([bytes[34], bytes[35]]);
    assert_eq!(bits, 16);
}
