//! # Public API
//!
//! The compiler's main entry points, mirroring the pipeline in order:
//! [`parse`] (C1) -> [`resolve`] (C3, which invokes the expander internally)
//! -> [`render_pcm`] (C4) or one of the exporters (C5).
//!
//! ## Typical usage
//!
//! ```rust
//! use gbscore::{parse, resolve};
//!
//! let source = "pat A = C4 D4 E4 F4\nbpm 120\nchannel 1 => pat A\n";
//! let (score, _warnings) = parse(source)?;
//! let (song, _warnings) = resolve(&score)?;
//! assert_eq!(song.channels[0].events.len(), 4);
//! # Ok::<(), gbscore::GbscoreError>(())
//! ```
//!
//! ## Rendering and export
//!
//! ```rust
//! use gbscore::{parse, resolve, render_pcm, RenderOptions};
//!
//! let (score, _) = parse("pat A = C4 D4\nbpm 120\nchannel 1 => pat A\n").unwrap();
//! let (song, _) = resolve(&score).unwrap();
//! let (pcm, _) = render_pcm(&song, &RenderOptions::default());
//! assert!(!pcm.is_empty());
//! ```

use crate::ast::AbstractScore;
use crate::error::{Result, Warning};
use crate::exporters::json::export_json as export_json_impl;
use crate::exporters::midi::{export_midi as export_midi_impl, MidiOptions};
use crate::exporters::uge::{export_uge as export_uge_impl, UgeOptions};
use crate::exporters::wav::{export_wav as export_wav_impl, WavOptions};
use crate::render::{render_pcm as render_pcm_impl, RenderOptions};
use crate::resolver::ResolvedSong;

/// Parse score source text into an [`AbstractScore`] (C1).
pub fn parse(source: &str) -> Result<(AbstractScore, Vec<Warning>)> {
    crate::parser::parse(source)
}

/// Expand and resolve an [`AbstractScore`] into a [`ResolvedSong`] (C2 + C3).
pub fn resolve(score: &AbstractScore) -> Result<(ResolvedSong, Vec<Warning>)> {
    crate::resolver::resolve(score)
}

/// Render a [`ResolvedSong`] to an interleaved PCM float buffer (C4).
pub fn render_pcm(song: &ResolvedSong, options: &RenderOptions) -> (Vec<f32>, Vec<Warning>) {
    render_pcm_impl(song, options)
}

/// Render and encode a [`ResolvedSong`] as a WAV file.
pub fn export_wav(
    song: &ResolvedSong,
    render_options: &RenderOptions,
    wav_options: &WavOptions,
) -> Result<(Vec<u8>, Vec<Warning>)> {
    export_wav_impl(song, render_options, wav_options)
}

/// Export a [`ResolvedSong`] as a Standard MIDI File (SMF Type-1).
pub fn export_midi(song: &ResolvedSong, options: &MidiOptions) -> Result<(Vec<u8>, Vec<Warning>)> {
    export_midi_impl(song, options)
}

/// Export a [`ResolvedSong`] as a hUGETracker `.uge` v6 binary.
pub fn export_uge(song: &ResolvedSong, options: &UgeOptions) -> Result<(Vec<u8>, Vec<Warning>)> {
    export_uge_impl(song, options)
}

/// Serialize a [`ResolvedSong`] to JSON, with an `effectMeta` table and
/// export timestamp.
pub fn export_json(song: &ResolvedSong) -> Result<Vec<u8>> {
    export_json_impl(song)
}

/// Parse and resolve in one call — the common case when a caller doesn't
/// need the intermediate [`AbstractScore`].
pub fn compile(source: &str) -> Result<(ResolvedSong, Vec<Warning>)> {
    let (score, mut warnings) = parse(source)?;
    let (song, resolve_warnings) = resolve(&score)?;
    warnings.extend(resolve_warnings);
    Ok((song, warnings))
}
