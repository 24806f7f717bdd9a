//! # PCM Renderer
//!
//! Consumes a [`ResolvedSong`] and produces a deterministic, sample-accurate
//! interleaved float buffer in `[-1, +1]`, by driving one [`ChannelGenerator`]
//! per active note and mixing through [`equal_power_pan`].
//!
//! Tick duration is `tickSeconds = 60 / bpm / 4` (16th-note resolution,
//! matching the score language's token grain). A `Note`/`NamedHit` occupies
//! one tick extended by any run of following `Sustain`s; `Rest` advances time
//! without starting a generator.

use crate::apu::{equal_power_pan, ChannelGenerator};
use crate::ast::{Instrument, InstrumentType, Pan, PanEnum};
use crate::error::Warning;
use crate::resolver::{ChannelEvent, ResolvedSong};

/// Render options (§10.3). `channels` controls output layout, not the song's
/// Game Boy channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub sample_rate: u32,
    pub channels: ChannelCount,
    pub bpm_override: Option<u32>,
    pub duration_override: Option<f64>,
    pub render_channels: Option<Vec<u8>>,
    pub normalize: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: ChannelCount::Mono,
            bpm_override: None,
            duration_override: None,
            render_channels: None,
            normalize: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCount {
    Mono,
    Stereo,
}

impl ChannelCount {
    fn count(self) -> usize {
        match self {
            ChannelCount::Mono => 1,
            ChannelCount::Stereo => 2,
        }
    }
}

/// One event, flattened into its absolute start sample and sample length (1
/// tick + following `Sustain`s, scaled by the channel's `speed`), paired with
/// the instrument that should voice it.
struct ScheduledEvent<'a> {
    start_sample: u64,
    len_samples: u64,
    midi: i32,
    instrument: Option<&'a Instrument>,
    kind: InstrumentType,
    pan: Option<Pan>,
}

const CLIP_PEAK: f32 = 0.95;

/// Render a [`ResolvedSong`] to an interleaved PCM buffer, returning any
/// warnings accumulated from out-of-range notes or unknown instrument
/// references.
pub fn render_pcm(song: &ResolvedSong, options: &RenderOptions) -> (Vec<f32>, Vec<Warning>) {
    let mut warnings = Vec::new();
    let bpm = options.bpm_override.unwrap_or(song.bpm).max(1);
    let tick_seconds = 60.0 / bpm as f64 / 4.0;
    let samples_per_tick = (tick_seconds * options.sample_rate as f64).round().max(1.0);

    let mut total_samples_needed = 0u64;
    let mut scheduled: Vec<ScheduledEvent> = Vec::new();

    for channel in &song.channels {
        if let Some(whitelist) = &options.render_channels {
            if !whitelist.contains(&channel.id) {
                continue;
            }
        }
        let events = schedule_channel(channel, song, samples_per_tick, &mut warnings);
        for ev in &events {
            total_samples_needed = total_samples_needed.max(ev.start_sample + ev.len_samples);
        }
        scheduled.extend(events);
    }

    let mut total_samples = total_samples_needed;
    if let Some(duration) = options.duration_override {
        total_samples = (duration * options.sample_rate as f64).round().max(0.0) as u64;
    }
    let total_samples = total_samples as usize;

    let out_channels = options.channels.count();
    let mut buffer = vec![0.0f32; total_samples * out_channels];

    for ev in scheduled {
        let start_sample = ev.start_sample;
        if start_sample as usize >= total_samples {
            continue;
        }
        let len_samples = ev.len_samples as usize;
        let end_sample = ((start_sample as usize) + len_samples).min(total_samples);

        let instrument = match ev.instrument {
            Some(i) => i.clone(),
            None => default_instrument_for(ev.kind),
        };
        let mut gen = ChannelGenerator::new(ev.kind, &instrument, ev.midi, options.sample_rate, &mut warnings);
        let pan = ev.pan.or(instrument.pan);
        let (gain_l, gain_r) = match pan {
            Some(p) => equal_power_pan(p),
            None => equal_power_pan(Pan::Enum(PanEnum::C)),
        };

        for i in start_sample as usize..end_sample {
            let sample = gen.next_sample();
            match options.channels {
                ChannelCount::Mono => {
                    buffer[i] += sample * (gain_l + gain_r) * 0.5;
                }
                ChannelCount::Stereo => {
                    buffer[i * 2] += sample * gain_l;
                    buffer[i * 2 + 1] += sample * gain_r;
                }
            }
        }
    }

    normalize_or_clip(&mut buffer, options.normalize);
    (buffer, warnings)
}

fn normalize_or_clip(buffer: &mut [f32], normalize: bool) {
    let peak = buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= 0.0 {
        return;
    }
    if normalize {
        let scale = CLIP_PEAK / peak;
        for s in buffer.iter_mut() {
            *s *= scale;
        }
    } else if peak > CLIP_PEAK {
        let scale = CLIP_PEAK / peak;
        for s in buffer.iter_mut() {
            *s *= scale;
        }
    }
}

fn default_instrument_for(kind: InstrumentType) -> Instrument {
    Instrument::new("__default", kind)
}

/// Walk one channel's resolved events into a flat list of scheduled notes,
/// folding `Sustain` runs into the preceding `Note`/`NamedHit`'s duration.
/// `samples_per_tick` is the song-wide tick length; the channel's own
/// `speed` multiplier scales it so a `speed=2` channel plays its tokens at
/// twice the rate (half the per-tick duration) of the song's base tempo.
fn schedule_channel<'a>(
    channel: &'a crate::resolver::ResolvedChannel,
    song: &'a ResolvedSong,
    samples_per_tick: f64,
    warnings: &mut Vec<Warning>,
) -> Vec<ScheduledEvent<'a>> {
    let mut out = Vec::new();
    let speed = channel.speed.unwrap_or(1.0).max(0.0001) as f64;
    let channel_samples_per_tick = samples_per_tick / speed;
    let mut elapsed = 0.0f64;
    let mut pending: Option<usize> = None; // index into `out` of the event still accepting Sustains

    for event in &channel.events {
        match event {
            ChannelEvent::Rest => {
                pending = None;
                elapsed += channel_samples_per_tick;
            }
            ChannelEvent::Sustain => {
                if let Some(idx) = pending {
                    out[idx].len_samples += channel_samples_per_tick.round() as u64;
                } else {
                    warnings.push(Warning::new(
                        format!("channel {}", channel.id),
                        "sustain with no preceding note, treated as rest",
                    ));
                }
                elapsed += channel_samples_per_tick;
            }
            ChannelEvent::Note {
                pitch,
                instrument,
                pan,
                effects: _,
                legato: _,
            } => {
                let (resolved_instrument, kind) = lookup_instrument(song, instrument.as_deref(), warnings);
                out.push(ScheduledEvent {
                    start_sample: elapsed.round() as u64,
                    len_samples: channel_samples_per_tick.round().max(1.0) as u64,
                    midi: pitch.to_midi(),
                    instrument: resolved_instrument,
                    kind,
                    pan: pan.clone(),
                });
                pending = Some(out.len() - 1);
                elapsed += channel_samples_per_tick;
            }
            ChannelEvent::NamedHit {
                name,
                instrument,
                default_note,
            } => {
                let lookup_name = instrument.as_deref().or(Some(name.as_str()));
                let (resolved_instrument, kind) = lookup_instrument(song, lookup_name, warnings);
                let midi = resolved_instrument
                    .and_then(|i| i.note)
                    .or(*default_note)
                    .map(|p| p.to_midi())
                    .unwrap_or(crate::apu::TABLE_MIN_MIDI);
                out.push(ScheduledEvent {
                    start_sample: elapsed.round() as u64,
                    len_samples: channel_samples_per_tick.round().max(1.0) as u64,
                    midi,
                    instrument: resolved_instrument,
                    kind,
                    pan: None,
                });
                pending = Some(out.len() - 1);
                elapsed += channel_samples_per_tick;
            }
        }
    }
    out
}

fn lookup_instrument<'a>(
    song: &'a ResolvedSong,
    name: Option<&str>,
    warnings: &mut Vec<Warning>,
) -> (Option<&'a Instrument>, InstrumentType) {
    match name.and_then(|n| song.instruments.get(n)) {
        Some(i) => (Some(i), i.kind),
        None => {
            if let Some(n) = name {
                if !n.is_empty() {
                    warnings.push(Warning::new("render", format!("unknown instrument '{n}', using default pulse1")));
                }
            }
            (None, InstrumentType::Pulse1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PlayMode, SongMetadata};
    use crate::resolver::{ChannelEvent as CE, ResolvedChannel};
    use std::collections::HashMap;

    fn empty_song(channels: Vec<ResolvedChannel>) -> ResolvedSong {
        ResolvedSong {
            chip: "gameboy".to_string(),
            bpm: 120,
            volume: 1.0,
            play: PlayMode::default(),
            metadata: SongMetadata::default(),
            instruments: HashMap::new(),
            channels,
        }
    }

    #[test]
    fn silence_when_all_channels_rest() {
        let song = empty_song(vec![ResolvedChannel {
            id: 1,
            speed: None,
            default_instrument: None,
            events: vec![CE::Rest, CE::Rest, CE::Rest],
        }]);
        let (buf, _) = render_pcm(&song, &RenderOptions::default());
        assert!(buf.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn buffer_stays_in_unit_range() {
        use crate::ast::Pitch;
        let pitch = Pitch::from_midi(60);
        let song = empty_song(vec![ResolvedChannel {
            id: 1,
            speed: None,
            default_instrument: None,
            events: vec![
                CE::Note {
                    pitch,
                    instrument: None,
                    pan: None,
                    effects: vec![],
                    legato: false,
                },
                CE::Sustain,
                CE::Sustain,
                CE::Rest,
            ],
        }]);
        let (buf, _) = render_pcm(&song, &RenderOptions::default());
        assert!(!buf.is_empty());
        assert!(buf.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    #[test]
    fn normalize_scales_peak_to_target() {
        use crate::ast::Pitch;
        let pitch = Pitch::from_midi(48);
        let song = empty_song(vec![ResolvedChannel {
            id: 1,
            speed: None,
            default_instrument: None,
            events: vec![CE::Note {
                pitch,
                instrument: None,
                pan: None,
                effects: vec![],
                legato: false,
            }],
        }]);
        let mut opts = RenderOptions::default();
        opts.normalize = true;
        let (buf, _) = render_pcm(&song, &opts);
        let peak = buf.iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!((peak - CLIP_PEAK).abs() < 0.01);
    }

    #[test]
    fn render_channels_whitelist_excludes_others() {
        use crate::ast::Pitch;
        let pitch = Pitch::from_midi(60);
        let make_channel = |id| ResolvedChannel {
            id,
            speed: None,
            default_instrument: None,
            events: vec![CE::Note {
                pitch,
                instrument: None,
                pan: None,
                effects: vec![],
                legato: false,
            }],
        };
        let song = empty_song(vec![make_channel(1), make_channel(2)]);
        let mut opts = RenderOptions::default();
        opts.render_channels = Some(vec![1]);
        let (only_one, _) = render_pcm(&song, &opts);
        let (both, _) = render_pcm(&song, &RenderOptions::default());
        let peak_one = only_one.iter().fold(0.0f32, |a, s| a.max(s.abs()));
        let peak_both = both.iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(peak_both >= peak_one);
    }
}
