//! # Resolver (C3)
//!
//! Walks each channel's expanded token stream (patterns and sequences resolved
//! by [`crate::expander`]) into a typed [`ChannelEvent`] stream, tracking
//! instrument-override state, pending pan, and inline effects along the way.
//! The output, a [`ResolvedSong`], is immutable and exporter-ready: nothing
//! downstream of this module mutates instrument tables or event streams.
//!
//! ## Instrument state machine
//!
//! Each channel walk carries `current_instrument` (seeded from the channel
//! declaration), and an optional `(temp_instrument, temp_remaining)` pair for
//! `inst(name, N)` overrides. The temporary override only counts down on
//! sound-emitting events — `Rest` and `Sustain` never touch it — and clears
//! itself once the counter reaches zero.
//!
//! ## Pan precedence
//!
//! For a given `Note`, pan resolves in priority order: an inline `<pan:…>`
//! effect, then a `pan(x)` sentinel still in scope, then the instrument's own
//! `pan` field, then nothing.

use crate::ast::{AbstractScore, ArrangeRow, EffectParam, EffectSpec, Instrument, Pan, Pitch, SeqItem, SongMetadata, PlayMode, parse_note_token};
use crate::error::{Result, Warning};
use crate::expander::Expander;
use crate::lexer::{split_commas, split_once_top_level};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resolved, typed event for one channel at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelEvent {
    Note {
        pitch: Pitch,
        instrument: Option<String>,
        pan: Option<Pan>,
        effects: Vec<Effect>,
        legato: bool,
    },
    Rest,
    Sustain,
    NamedHit {
        name: String,
        instrument: Option<String>,
        default_note: Option<Pitch>,
    },
}

/// A resolved inline or preset effect attached to a [`ChannelEvent::Note`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: String,
    pub params: Vec<EffectParam>,
}

/// One channel's resolved event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedChannel {
    pub id: u8,
    pub speed: Option<f32>,
    pub default_instrument: Option<String>,
    pub events: Vec<ChannelEvent>,
}

/// The full, immutable output of the resolver: ready for rendering or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSong {
    pub chip: String,
    pub bpm: u32,
    pub volume: f32,
    pub play: PlayMode,
    pub metadata: SongMetadata,
    pub instruments: HashMap<String, Instrument>,
    pub channels: Vec<ResolvedChannel>,
}

/// Resolve an [`AbstractScore`] into a [`ResolvedSong`], collecting warnings
/// (unknown instrument references, filtered arpeggio offsets, sweep-on-non-pulse1).
pub fn resolve(score: &AbstractScore) -> Result<(ResolvedSong, Vec<Warning>)> {
    let mut warnings = Vec::new();
    let expander = Expander::new(&score.sequences, &score.patterns);

    let mut channels = Vec::with_capacity(score.channels.len());
    for decl in &score.channels {
        let tokens = channel_tokens(score, &expander, decl.id, &decl.items)?;
        let events = walk_tokens(&tokens, decl.default_instrument.clone(), &score.effects, &score.instruments, &mut warnings);
        channels.push(ResolvedChannel {
            id: decl.id,
            speed: decl.speed,
            default_instrument: decl.default_instrument.clone(),
            events,
        });
    }

    Ok((
        ResolvedSong {
            chip: score.chip.clone(),
            bpm: score.bpm,
            volume: score.volume,
            play: score.play,
            metadata: score.metadata.clone(),
            instruments: score.instruments.clone(),
            channels,
        },
        warnings,
    ))
}

/// Expand a channel's item list into a flat token array, splicing in any
/// arrangement rows referenced by name (arrangements share the pattern/sequence
/// namespace from a channel's point of view, selected by column = `channel_id - 1`).
fn channel_tokens(
    score: &AbstractScore,
    expander: &Expander,
    channel_id: u8,
    items: &[SeqItem],
) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let column = (channel_id.saturating_sub(1)) as usize;
    for item in items {
        if let Some(rows) = score.arrangements.get(&item.name) {
            tokens.extend(expand_arrangement_column(rows, column, expander)?);
        } else {
            tokens.extend(expander.resolve_items(std::slice::from_ref(item))?);
        }
    }
    Ok(tokens)
}

/// Expand one column (one channel's worth) of an arrangement's rows.
fn expand_arrangement_column(rows: &[ArrangeRow], column: usize, expander: &Expander) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for row in rows {
        let mut slot_lengths = [0usize; 4];
        let mut slot_tokens: [Vec<String>; 4] = Default::default();
        for (i, slot) in row.slots.iter().enumerate() {
            if let Some(item) = slot {
                let item = apply_row_default_instrument(item, &row.defaults_inst);
                let expanded = expander.resolve_items(&[item])?;
                slot_lengths[i] = expanded.len();
                slot_tokens[i] = expanded;
            }
        }
        let row_len = slot_lengths.iter().copied().max().unwrap_or(0).max(1);
        if column < 4 {
            if row.slots[column].is_some() {
                out.extend(slot_tokens[column].iter().cloned());
            } else {
                out.extend(std::iter::repeat(".".to_string()).take(row_len));
            }
        }
    }
    Ok(out)
}

fn apply_row_default_instrument(item: &SeqItem, defaults_inst: &Option<String>) -> SeqItem {
    let has_inst = item.modifiers.iter().any(|m| m.starts_with("inst("));
    if has_inst {
        return item.clone();
    }
    match defaults_inst {
        Some(name) => {
            let mut modifiers = item.modifiers.clone();
            modifiers.push(format!("inst({name})"));
            SeqItem::new(item.name.clone(), modifiers)
        }
        None => item.clone(),
    }
}

enum TokenKind<'a> {
    InstPermanent(&'a str),
    InstTemp(&'a str, u32),
    Hit(&'a str, u32),
    Rest,
    Sustain,
    PanOpen(&'a str),
    PanClose,
    Other(&'a str),
}

fn classify(token: &str) -> TokenKind<'_> {
    if let Some(inner) = token.strip_prefix("inst(").and_then(|r| r.strip_suffix(')')) {
        let parts: Vec<&str> = inner.splitn(2, ',').map(|p| p.trim()).collect();
        if parts.len() == 2 {
            if let Ok(n) = parts[1].parse::<u32>() {
                if n > 0 {
                    return TokenKind::InstTemp(parts[0], n);
                }
            }
        }
        return TokenKind::InstPermanent(parts[0]);
    }
    if let Some(inner) = token.strip_prefix("hit(").and_then(|r| r.strip_suffix(')')) {
        let parts: Vec<&str> = inner.splitn(2, ',').map(|p| p.trim()).collect();
        if parts.len() == 2 {
            if let Ok(n) = parts[1].parse::<u32>() {
                return TokenKind::Hit(parts[0], n);
            }
        }
    }
    if token == "." || token.eq_ignore_ascii_case("r") || token == "rest" {
        return TokenKind::Rest;
    }
    if token == "_" || token == "-" {
        return TokenKind::Sustain;
    }
    if let Some(inner) = token.strip_prefix("pan(").and_then(|r| r.strip_suffix(')')) {
        return if inner.is_empty() {
            TokenKind::PanClose
        } else {
            TokenKind::PanOpen(inner)
        };
    }
    TokenKind::Other(token)
}

fn is_sound_token(token: &str) -> bool {
    matches!(classify(strip_effects_suffix(token).0), TokenKind::Other(_) | TokenKind::Hit(_, _))
}

/// Split `token<payload>` into the bare token and the effect payload, if present.
fn strip_effects_suffix(token: &str) -> (&str, Option<&str>) {
    if let Some(open) = token.find('<') {
        if token.ends_with('>') {
            return (&token[..open], Some(&token[open + 1..token.len() - 1]));
        }
    }
    (token, None)
}

fn parse_inline_effects(
    payload: &str,
    presets: &HashMap<String, EffectSpec>,
    warnings: &mut Vec<Warning>,
) -> (Option<Pan>, Vec<Effect>) {
    let mut effects: Vec<Effect> = Vec::new();
    for part in split_commas(payload) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((kind, first_param)) = split_once_top_level(part, ':') {
            let mut params = Vec::new();
            if let Some(p) = EffectParam::parse(&first_param) {
                params.push(p);
            }
            effects.push(Effect { kind: kind.trim().to_string(), params });
        } else if let Some(preset) = presets.get(part) {
            effects.push(Effect { kind: preset.kind.clone(), params: preset.params.clone() });
        } else if let Some(last) = effects.last_mut() {
            if let Some(p) = EffectParam::parse(part) {
                last.params.push(p);
            }
        }
    }

    let mut pan = None;
    effects.retain(|e| {
        if e.kind == "pan" {
            if let Some(v) = e.params.first().and_then(|p| p.as_f64()) {
                pan = Some(Pan::numeric(v as f32));
            }
            false
        } else {
            true
        }
    });

    for e in effects.iter_mut() {
        if e.kind == "arp" {
            let before = e.params.len();
            e.params.retain(|p| p.as_f64().map(|v| v >= 0.0).unwrap_or(true));
            if e.params.len() != before {
                warnings.push(Warning::new("arp effect", "negative offsets filtered"));
            }
        }
    }

    (pan, effects)
}

fn walk_tokens(
    tokens: &[String],
    default_instrument: Option<String>,
    presets: &HashMap<String, EffectSpec>,
    instruments: &HashMap<String, Instrument>,
    warnings: &mut Vec<Warning>,
) -> Vec<ChannelEvent> {
    let mut events = Vec::with_capacity(tokens.len());
    let mut current_instrument = default_instrument;
    let mut temp_instrument: Option<String> = None;
    let mut temp_remaining = 0u32;
    let mut pending_pan: Option<Pan> = None;

    for (idx, raw) in tokens.iter().enumerate() {
        let (bare, payload) = strip_effects_suffix(raw);
        let (inline_pan, effects) = match payload {
            Some(p) => parse_inline_effects(p, presets, warnings),
            None => (None, Vec::new()),
        };

        match classify(bare) {
            TokenKind::InstPermanent(name) => {
                current_instrument = Some(name.to_string());
            }
            TokenKind::InstTemp(name, n) => {
                if tokens[idx + 1..].iter().any(|t| is_sound_token(t)) {
                    temp_instrument = Some(name.to_string());
                    temp_remaining = n;
                } else {
                    for _ in 0..n {
                        events.push(ChannelEvent::NamedHit {
                            name: name.to_string(),
                            instrument: Some(name.to_string()),
                            default_note: instruments.get(name).and_then(|i| i.note),
                        });
                    }
                }
            }
            TokenKind::Hit(name, n) => {
                for _ in 0..n {
                    events.push(ChannelEvent::NamedHit {
                        name: name.to_string(),
                        instrument: Some(name.to_string()),
                        default_note: instruments.get(name).and_then(|i| i.note),
                    });
                }
            }
            TokenKind::Rest => events.push(ChannelEvent::Rest),
            TokenKind::Sustain => events.push(ChannelEvent::Sustain),
            TokenKind::PanOpen(x) => pending_pan = Pan::from_str(x),
            TokenKind::PanClose => pending_pan = None,
            TokenKind::Other(tok) => {
                let effective = if temp_remaining > 0 {
                    temp_instrument.clone()
                } else {
                    current_instrument.clone()
                };

                if let Some(pitch) = parse_note_token(tok) {
                    let pan = inline_pan
                        .or_else(|| pending_pan)
                        .or_else(|| effective.as_ref().and_then(|name| instruments.get(name)).and_then(|i| i.pan));
                    events.push(ChannelEvent::Note {
                        pitch,
                        instrument: effective.clone(),
                        pan,
                        effects,
                        legato: false,
                    });
                } else {
                    if let Some(name) = &effective {
                        if !instruments.contains_key(name) {
                            warnings.push(Warning::new("resolver", format!("unknown instrument `{name}` referenced")));
                        }
                    }
                    if !instruments.contains_key(tok) {
                        warnings.push(Warning::new("resolver", format!("unresolved token `{tok}` treated as named hit")));
                    }
                    events.push(ChannelEvent::NamedHit {
                        name: tok.to_string(),
                        instrument: Some(tok.to_string()),
                        default_note: instruments.get(tok).and_then(|i| i.note),
                    });
                }

                if temp_remaining > 0 {
                    temp_remaining -= 1;
                    if temp_remaining == 0 {
                        temp_instrument = None;
                    }
                }
            }
        }
    }

    events
}
