//! # Abstract Score
//!
//! This module defines the output type of the [`crate::parser`] module: a structured,
//! not-yet-expanded representation of a score's source text.
//!
//! ## Type Hierarchy
//! ```text
//! AbstractScore
//!   ├── chip, bpm, volume, play, metadata
//!   ├── patterns:     name -> Vec<raw token string>
//!   ├── sequences:     name -> Vec<SeqItem>
//!   ├── arrangements:  name -> Vec<ArrangeRow>
//!   ├── instruments:   name -> Instrument
//!   ├── effects:       name -> EffectSpec   (the `effect NAME = ...` preset table)
//!   └── channels:      Vec<ChannelDecl>
//! ```
//!
//! ## Key Concepts
//!
//! ### Raw pattern tokens
//! A pattern's right-hand side is stored as raw, un-expanded strings: grouping
//! (`(C4 E4 G4)*2`), shorthand repetition (`C4*3`), and duration annotation (`C4:3`)
//! all survive into this stage as single token strings. Expansion into a flat note
//! stream is the job of [`crate::expander`] (component C2); this module only
//! tokenizes and structures, it does not interpret rhythm.
//!
//! ### Octave convention
//! Octave numbers are absolute (not relative to a key), following the token grammar
//! `[A-G](#|b)?-?[0-9]+`. `C3` is MIDI note 36 in this crate's numbering (see
//! [`crate::apu::period_table`]); octaves run from -1 to 9.
//!
//! ## Related Modules
//! - `parser` - builds these types from score source text
//! - `expander` - expands pattern/sequence token arrays (C2)
//! - `resolver` - walks expanded tokens into a `ResolvedSong` (C3)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One of the seven natural note letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl NoteName {
    /// Semitone offset from C within an octave, before any accidental.
    pub fn natural_semitone(self) -> i32 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            NoteName::A => 'A',
            NoteName::B => 'B',
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
        }
    }
}

/// An accidental written on a note token. `Sharp` is the only accidental kept after
/// transpose canonicalization; `Flat` only appears on tokens that have never passed
/// through a transpose step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

/// A concrete pitch: note letter, accidental, and absolute octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub name: NoteName,
    pub accidental: Accidental,
    pub octave: i8,
}

impl Pitch {
    pub fn new(name: NoteName, accidental: Accidental, octave: i8) -> Self {
        Self {
            name,
            accidental,
            octave,
        }
    }

    /// This crate's MIDI numbering: `midi = 12*octave + semitone_offset`, so that
    /// `C3` is note 36 (see GLOSSARY: "Note index (UGE)").
    pub fn to_midi(self) -> i32 {
        let accidental = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        };
        12 * self.octave as i32 + self.name.natural_semitone() + accidental
    }

    /// Rebuild a `Pitch` from a MIDI number, always spelled with sharps (or
    /// natural), never flats. Used after transpose arithmetic to canonicalize
    /// spelling per §4.2 step 7.
    pub fn from_midi(midi: i32) -> Self {
        let octave = midi.div_euclid(12) as i8;
        let semitone = midi.rem_euclid(12);
        let (name, accidental) = match semitone {
            0 => (NoteName::C, Accidental::Natural),
            1 => (NoteName::C, Accidental::Sharp),
            2 => (NoteName::D, Accidental::Natural),
            3 => (NoteName::D, Accidental::Sharp),
            4 => (NoteName::E, Accidental::Natural),
            5 => (NoteName::F, Accidental::Natural),
            6 => (NoteName::F, Accidental::Sharp),
            7 => (NoteName::G, Accidental::Natural),
            8 => (NoteName::G, Accidental::Sharp),
            9 => (NoteName::A, Accidental::Natural),
            10 => (NoteName::A, Accidental::Sharp),
            _ => (NoteName::B, Accidental::Natural),
        };
        Pitch::new(name, accidental, octave)
    }

    /// Transpose by whole octaves and semitones, canonicalizing to sharp spelling
    /// and clamping into octave range [-1, 9] (§4.2 step 7).
    pub fn transposed(self, octaves: i32, semitones: i32) -> Self {
        let midi = self.to_midi() + 12 * octaves + semitones;
        let clamped_midi = midi.clamp(12 * -1, 12 * 9 + 11);
        Pitch::from_midi(clamped_midi)
    }
}

/// Parse a note token matching `[A-G](#|b)?-?[0-9]+` (flat marker is lowercase
/// `b`; the note letter itself is case-insensitive and canonicalized upper-case).
/// Returns `None` for anything else (rests, sustains, instrument names, sentinels).
pub fn parse_note_token(s: &str) -> Option<Pitch> {
    let mut chars = s.chars().peekable();
    let first = chars.next()?;
    let name = NoteName::from_char(first)?;
    let mut accidental = Accidental::Natural;
    if let Some(&c) = chars.peek() {
        if c == '#' {
            accidental = Accidental::Sharp;
            chars.next();
        } else if c == 'b' {
            accidental = Accidental::Flat;
            chars.next();
        }
    }
    let rest: String = chars.collect();
    if rest.is_empty() {
        return None;
    }
    let octave: i8 = rest.parse().ok()?;
    Some(Pitch::new(name, accidental, octave))
}

impl std::fmt::Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let acc = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
        };
        write!(f, "{}{}{}", self.name.as_char(), acc, self.octave)
    }
}

/// Game Boy channel kind an instrument targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Pulse1,
    Pulse2,
    Wave,
    Noise,
}

impl InstrumentType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pulse1" => Some(InstrumentType::Pulse1),
            "pulse2" => Some(InstrumentType::Pulse2),
            "wave" => Some(InstrumentType::Wave),
            "noise" => Some(InstrumentType::Noise),
            _ => None,
        }
    }
}

/// Direction an envelope or sweep moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Game Boy volume envelope: initial volume, direction, and step period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub initial: u8,
    pub direction: Direction,
    pub period: u8,
}

/// Pulse-channel frequency sweep (pulse1 only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub time: u8,
    pub direction: Direction,
    pub shift: u8,
}

/// Left/right panning, either a discrete hardware-style position or a numeric pan
/// in [-1, +1] for equal-power mixing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pan {
    Enum(PanEnum),
    Numeric(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanEnum {
    L,
    C,
    R,
}

impl Pan {
    pub fn numeric(value: f32) -> Self {
        Pan::Numeric(value.clamp(-1.0, 1.0))
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Pan::Enum(PanEnum::L)),
            "C" => Some(Pan::Enum(PanEnum::C)),
            "R" => Some(Pan::Enum(PanEnum::R)),
            other => other.parse::<f32>().ok().map(Pan::numeric),
        }
    }
}

/// A single instrument definition: recognized properties vary by [`InstrumentType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub kind: InstrumentType,
    pub duty: Option<f32>,
    pub env: Option<Envelope>,
    pub sweep: Option<Sweep>,
    pub wave: Option<Vec<u8>>,
    pub width: Option<u8>,
    pub divisor: Option<u8>,
    pub shift: Option<u8>,
    pub volume: Option<u8>,
    pub pan: Option<Pan>,
    pub note: Option<Pitch>,
    pub gm: Option<u8>,
}

impl Instrument {
    pub fn new(name: impl Into<String>, kind: InstrumentType) -> Self {
        Self {
            name: name.into(),
            kind,
            duty: None,
            env: None,
            sweep: None,
            wave: None,
            width: None,
            divisor: None,
            shift: None,
            volume: None,
            pan: None,
            note: None,
            gm: None,
        }
    }
}

/// A reference to a pattern or sequence, with its colon-separated modifier chain,
/// as it appears inside a `seq`, `channel`, or arrangement slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeqItem {
    pub name: String,
    pub modifiers: Vec<String>,
}

impl SeqItem {
    pub fn new(name: impl Into<String>, modifiers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            modifiers,
        }
    }
}

/// One row of an `arrange` block: up to four per-channel slots plus a row-scoped
/// default instrument for slots that omit one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrangeRow {
    pub slots: [Option<SeqItem>; 4],
    pub defaults_inst: Option<String>,
}

/// A named effect preset, as declared by `effect NAME = type:params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: String,
    pub params: Vec<EffectParam>,
}

/// One comma-separated parameter of an effect invocation: numeric params parse
/// eagerly, everything else stays a string (§4.3 effects parsing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectParam {
    Number(f64),
    Text(String),
}

impl EffectParam {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(n) = raw.parse::<f64>() {
            Some(EffectParam::Number(n))
        } else {
            Some(EffectParam::Text(raw.to_string()))
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EffectParam::Number(n) => Some(*n),
            EffectParam::Text(_) => None,
        }
    }
}

/// `play [auto] [repeat]` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayMode {
    pub auto: bool,
    pub repeat: bool,
}

/// `song name|artist|description|tags "..."` metadata block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SongMetadata {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// A `channel <id> => [inst <name>] (pat|seq) <spec> [speed=<num>]` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDecl {
    pub id: u8,
    pub default_instrument: Option<String>,
    pub items: Vec<SeqItem>,
    pub speed: Option<f32>,
}

/// The full, not-yet-expanded score, as produced by [`crate::parser::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractScore {
    pub chip: String,
    pub bpm: u32,
    pub volume: f32,
    pub play: PlayMode,
    pub metadata: SongMetadata,
    pub patterns: HashMap<String, Vec<String>>,
    pub sequences: HashMap<String, Vec<SeqItem>>,
    pub arrangements: HashMap<String, Vec<ArrangeRow>>,
    pub instruments: HashMap<String, Instrument>,
    pub effects: HashMap<String, EffectSpec>,
    pub channels: Vec<ChannelDecl>,
    /// Raw `import "..."` specs in source order, left unresolved: resolving them
    /// needs an injectable [`crate::imports::Fetcher`] and is a separate step
    /// (see [`crate::imports::merge_imports`]).
    pub imports: Vec<String>,
}

impl Default for AbstractScore {
    fn default() -> Self {
        Self {
            chip: "gameboy".to_string(),
            bpm: 128,
            volume: 1.0,
            play: PlayMode::default(),
            metadata: SongMetadata::default(),
            patterns: HashMap::new(),
            sequences: HashMap::new(),
            arrangements: HashMap::new(),
            instruments: HashMap::new(),
            effects: HashMap::new(),
            channels: Vec::new(),
            imports: Vec::new(),
        }
    }
}
