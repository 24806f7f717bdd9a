//! # Standard MIDI File Export
//!
//! Writes an SMF Type-1 file (`byteorder` for the handful of fixed-width
//! big-endian header fields; everything else — variable-length quantities,
//! meta/channel events — is hand-rolled, since no crate in the ecosystem
//! models this exact GB-to-GM mapping). One track per resolved channel, fixed
//! 480 PPQ, track 0 also carries the tempo meta event.

use crate::ast::{Instrument, InstrumentType};
use crate::error::{Result, Warning};
use crate::resolver::{ChannelEvent, ResolvedChannel, ResolvedSong};
use byteorder::{BigEndian, WriteBytesExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiOptions {
    pub ppq: u16,
}

impl Default for MidiOptions {
    fn default() -> Self {
        Self { ppq: 480 }
    }
}

const PERCUSSION_CHANNEL: u8 = 9; // MIDI channel 10, zero-based

fn gm_program_for(kind: InstrumentType) -> u8 {
    match kind {
        InstrumentType::Pulse1 => 80,
        InstrumentType::Pulse2 => 34,
        InstrumentType::Wave => 81,
        InstrumentType::Noise => 0,
    }
}

fn percussion_key(name: &str) -> u8 {
    match name {
        "snare" => 38,
        "hihat" => 42,
        "kick" => 36,
        _ => 39,
    }
}

fn channel_kind(song: &ResolvedSong, channel: &ResolvedChannel) -> InstrumentType {
    if let Some(name) = &channel.default_instrument {
        if let Some(inst) = song.instruments.get(name) {
            return inst.kind;
        }
    }
    for event in &channel.events {
        if let ChannelEvent::Note { instrument: Some(name), .. } | ChannelEvent::NamedHit { instrument: Some(name), .. } = event {
            if let Some(inst) = song.instruments.get(name) {
                return inst.kind;
            }
        }
    }
    InstrumentType::Pulse1
}

struct TrackEvent {
    tick: u32,
    bytes: Vec<u8>,
}

fn write_vlq(buf: &mut Vec<u8>, value: u32) {
    let mut buffer = value & 0x7F;
    let mut v = value >> 7;
    while v > 0 {
        buffer <<= 8;
        buffer |= 0x80 | (v & 0x7F);
        v >>= 7;
    }
    loop {
        buf.push((buffer & 0xFF) as u8);
        if buffer & 0x80 != 0 {
            buffer >>= 8;
        } else {
            break;
        }
    }
}

fn meta_text(kind: u8, text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, kind];
    write_vlq(&mut out, text.len() as u32);
    out.extend_from_slice(text.as_bytes());
    out
}

fn note_on(channel: u8, note: u8, velocity: u8) -> Vec<u8> {
    vec![0x90 | (channel & 0x0F), note, velocity]
}

fn note_off(channel: u8, note: u8) -> Vec<u8> {
    vec![0x80 | (channel & 0x0F), note, 0]
}

fn clamp_note(midi: i32) -> u8 {
    midi.clamp(0, 127) as u8
}

fn emit_effects(events: &mut Vec<TrackEvent>, tick: u32, channel: u8, effects: &[crate::resolver::Effect]) {
    for effect in effects {
        let params: Vec<String> = effect
            .params
            .iter()
            .map(|p| match p {
                crate::ast::EffectParam::Number(n) => n.to_string(),
                crate::ast::EffectParam::Text(s) => s.clone(),
            })
            .collect();
        let text = format!("{}:{}", effect.kind, params.join(","));
        match effect.kind.as_str() {
            "vib" | "port" | "trem" => {
                events.push(TrackEvent { tick, bytes: meta_text(0x01, &text) });
            }
            "volslide" => {
                let delta = effect.params.first().and_then(|p| p.as_f64()).unwrap_or(0.0);
                let value = (64.0 + delta).clamp(0.0, 127.0) as u8;
                events.push(TrackEvent { tick, bytes: vec![0xB0 | (channel & 0x0F), 7, value] });
                events.push(TrackEvent { tick, bytes: meta_text(0x01, &text) });
            }
            "bend" => {
                let semitones = effect.params.first().and_then(|p| p.as_f64()).unwrap_or(0.0);
                let bend = ((semitones / 2.0).clamp(-1.0, 1.0) * 8191.0) as i32 + 8192;
                let lsb = (bend & 0x7F) as u8;
                let msb = ((bend >> 7) & 0x7F) as u8;
                events.push(TrackEvent { tick, bytes: vec![0xE0 | (channel & 0x0F), lsb, msb] });
                events.push(TrackEvent { tick, bytes: meta_text(0x01, &text) });
            }
            _ => {}
        }
    }
}

/// Schedule one channel's notes/named-hits into absolute-tick MIDI events.
/// `ticks_per_token` is the song-wide base rate; the channel's own `speed`
/// multiplier scales it, same as the PCM renderer.
fn schedule_channel(
    song: &ResolvedSong,
    channel: &ResolvedChannel,
    midi_channel: u8,
    is_percussion: bool,
    ticks_per_token: u32,
) -> Vec<TrackEvent> {
    let speed = channel.speed.unwrap_or(1.0).max(0.0001);
    let ticks_per_token = ((ticks_per_token as f32 / speed).round().max(1.0)) as u32;
    let mut events = Vec::new();
    let mut tick = 0u32;
    let mut pending: Option<(u8, u32)> = None; // (note, start_tick) still open for Sustain

    let mut flush = |events: &mut Vec<TrackEvent>, pending: &mut Option<(u8, u32)>, end_tick: u32| {
        if let Some((note, _)) = pending.take() {
            events.push(TrackEvent { tick: end_tick, bytes: note_off(midi_channel, note) });
        }
    };

    for event in &channel.events {
        match event {
            ChannelEvent::Rest => {
                flush(&mut events, &mut pending, tick);
                tick += ticks_per_token;
            }
            ChannelEvent::Sustain => {
                tick += ticks_per_token;
            }
            ChannelEvent::Note { pitch, instrument, effects, .. } => {
                flush(&mut events, &mut pending, tick);
                let note = clamp_note(pitch.to_midi());
                events.push(TrackEvent { tick, bytes: note_on(midi_channel, note, 100) });
                emit_effects(&mut events, tick, midi_channel, effects);
                let _ = instrument;
                pending = Some((note, tick));
                tick += ticks_per_token;
            }
            ChannelEvent::NamedHit { name, instrument, default_note } => {
                flush(&mut events, &mut pending, tick);
                let note = if is_percussion {
                    percussion_key(name)
                } else {
                    let resolved: Option<&Instrument> = instrument.as_deref().and_then(|n| song.instruments.get(n));
                    let midi = resolved
                        .and_then(|i| i.note)
                        .or(*default_note)
                        .map(|p| p.to_midi())
                        .unwrap_or(60);
                    clamp_note(midi)
                };
                events.push(TrackEvent { tick, bytes: note_on(midi_channel, note, 100) });
                pending = Some((note, tick));
                tick += ticks_per_token;
            }
        }
    }
    flush(&mut events, &mut pending, tick);
    events
}

fn write_track(out: &mut Vec<u8>, mut events: Vec<TrackEvent>) -> Result<()> {
    events.sort_by_key(|e| e.tick);
    let mut data = Vec::new();
    let mut last_tick = 0u32;
    for event in &events {
        let delta = event.tick.saturating_sub(last_tick);
        write_vlq(&mut data, delta);
        data.extend_from_slice(&event.bytes);
        last_tick = event.tick;
    }
    // End of track
    write_vlq(&mut data, 0);
    data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    out.extend_from_slice(b"MTrk");
    out.write_u32::<BigEndian>(data.len() as u32)?;
    out.extend_from_slice(&data);
    Ok(())
}

/// Render a [`ResolvedSong`] to an SMF Type-1 byte stream.
pub fn export_midi(song: &ResolvedSong, options: &MidiOptions) -> Result<(Vec<u8>, Vec<Warning>)> {
    let _span = tracing::debug_span!("export_midi", channels = song.channels.len(), ppq = options.ppq).entered();
    let warnings = Vec::new();
    let ticks_per_token = (options.ppq / 4).max(1) as u32;

    let mut header = Vec::new();
    header.extend_from_slice(b"MThd");
    header.write_u32::<BigEndian>(6)?;
    header.write_u16::<BigEndian>(1)?;
    header.write_u16::<BigEndian>(song.channels.len().max(1) as u16)?;
    header.write_u16::<BigEndian>(options.ppq)?;

    let mut tracks = Vec::new();
    let mut next_melodic_channel = 0u8;

    for (idx, channel) in song.channels.iter().enumerate() {
        let kind = channel_kind(song, channel);
        let is_percussion = kind == InstrumentType::Noise;
        let midi_channel = if is_percussion {
            PERCUSSION_CHANNEL
        } else {
            let c = next_melodic_channel;
            next_melodic_channel = (next_melodic_channel + 1) % 9; // skip channel 10
            c
        };

        let mut events = Vec::new();
        if idx == 0 {
            let tempo_usec = (60_000_000.0 / song.bpm.max(1) as f64).round() as u32;
            let mut tempo_bytes = vec![0xFF, 0x51, 0x03];
            tempo_bytes.push(((tempo_usec >> 16) & 0xFF) as u8);
            tempo_bytes.push(((tempo_usec >> 8) & 0xFF) as u8);
            tempo_bytes.push((tempo_usec & 0xFF) as u8);
            events.push(TrackEvent { tick: 0, bytes: tempo_bytes });
        }
        if !is_percussion {
            let gm = channel
                .default_instrument
                .as_deref()
                .and_then(|n| song.instruments.get(n))
                .and_then(|i| i.gm)
                .unwrap_or_else(|| gm_program_for(kind));
            events.push(TrackEvent { tick: 0, bytes: vec![0xC0 | (midi_channel & 0x0F), gm] });
        }
        events.extend(schedule_channel(song, channel, midi_channel, is_percussion, ticks_per_token));
        tracing::debug!(channel = channel.id, midi_channel, is_percussion, "scheduled track");
        tracks.push(events);
    }

    let mut out = header;
    for track in tracks {
        write_track(&mut out, track)?;
    }
    Ok((out, warnings))
}
