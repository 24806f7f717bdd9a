//! # APU Synth Core (C4)
//!
//! A Game Boy-accurate (not cycle-accurate — see spec Non-goals) model of the
//! four hardware channels, shared by the offline PCM renderer ([`crate::render`])
//! and the UGE exporter's note-index/frequency bookkeeping. Each generator here
//! advances one sample at a time so callers can interleave channels, apply
//! sustain, and stop/restart notes without re-deriving timing state.
//!
//! ## Frequency model
//!
//! Game Boy pulse/wave channels are driven by an 11-bit period register `p`
//! with `f = 131072 / (2048 - p)`. [`period_table`] holds a 72-note (6-octave)
//! table of precomputed periods; notes outside `[TABLE_MIN_MIDI, TABLE_MAX_MIDI]`
//! clamp to the nearest valid octave and push a [`Warning`].
//!
//! ## UGE note index
//!
//! `midi - 36` (C3 is MIDI 36); see [`uge_note_index`] and GLOSSARY "Note index
//! (UGE)".

use crate::ast::{Direction, Instrument, InstrumentType, Pan, PanEnum};
use crate::error::Warning;
use std::sync::OnceLock;

/// Lowest MIDI note held in [`period_table`] (C1).
pub const TABLE_MIN_MIDI: i32 = 24;
/// Highest MIDI note held in [`period_table`] (B6); 72 notes inclusive.
pub const TABLE_MAX_MIDI: i32 = 95;

const TABLE_LEN: usize = (TABLE_MAX_MIDI - TABLE_MIN_MIDI + 1) as usize;

/// Precomputed 11-bit period register for each MIDI note in range, derived
/// from 12-TET (`A4 = 440 Hz`) and rounded to the nearest integer register —
/// the same quantization real hardware imposes.
pub fn period_table() -> &'static [u16; TABLE_LEN] {
    static TABLE: OnceLock<[u16; TABLE_LEN]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u16; TABLE_LEN];
        for (i, slot) in table.iter_mut().enumerate() {
            let midi = TABLE_MIN_MIDI + i as i32;
            let freq = 440.0_f64 * 2f64.powf((midi - 69) as f64 / 12.0);
            let period = 2048.0 - 131072.0 / freq;
            *slot = period.round().clamp(0.0, 2047.0) as u16;
        }
        table
    })
}

fn clamp_to_table_range(midi: i32, warnings: &mut Vec<Warning>) -> i32 {
    if midi < TABLE_MIN_MIDI || midi > TABLE_MAX_MIDI {
        let clamped = midi.clamp(TABLE_MIN_MIDI, TABLE_MAX_MIDI);
        warnings.push(Warning::new(
            "apu",
            format!(
                "note {midi} is outside the period table range [{TABLE_MIN_MIDI},{TABLE_MAX_MIDI}], clamped to {clamped}"
            ),
        ));
        clamped
    } else {
        midi
    }
}

/// Look up the 11-bit period register for a MIDI note, clamping into table
/// range and warning if it had to.
pub fn midi_to_period(midi: i32, warnings: &mut Vec<Warning>) -> u16 {
    let clamped = clamp_to_table_range(midi, warnings);
    period_table()[(clamped - TABLE_MIN_MIDI) as usize]
}

/// `f = 131072 / (2048 - p)`.
pub fn period_to_freq(register: u16) -> f32 {
    131072.0 / (2048.0 - register as f32)
}

/// `midiToFreq`: look up a note's period and reconstruct its frequency.
pub fn midi_to_freq(midi: i32, warnings: &mut Vec<Warning>) -> f32 {
    period_to_freq(midi_to_period(midi, warnings))
}

/// UGE pattern-cell note index: `midi - 36` (C3 -> 0).
pub fn uge_note_index(midi: i32) -> i32 {
    midi - 36
}

/// Equal-power stereo pan. Enum `L/C/R` maps to `-1/0/+1`; numeric values use
/// `angle = ((p+1)/2) * pi/2`, `(left, right) = (cos(angle), sin(angle))`.
pub fn equal_power_pan(pan: Pan) -> (f32, f32) {
    let p = match pan {
        Pan::Enum(PanEnum::L) => -1.0,
        Pan::Enum(PanEnum::C) => 0.0,
        Pan::Enum(PanEnum::R) => 1.0,
        Pan::Numeric(v) => v.clamp(-1.0, 1.0),
    };
    let angle = ((p + 1.0) / 2.0) * std::f32::consts::FRAC_PI_2;
    (angle.cos(), angle.sin())
}

const OUTPUT_GAIN: f32 = 0.6;

/// GB volume envelope: step duration `period * (1/64)` seconds (period 0 holds
/// the initial value forever), direction `up`/`down` moves volume by 1 each
/// step, clamped to `[0,15]`, normalized to `[0,1]` by the caller.
#[derive(Debug, Clone)]
struct EnvelopeState {
    volume: i32,
    direction: Direction,
    period: u8,
    elapsed_samples: u32,
    sample_rate: u32,
}

impl EnvelopeState {
    fn new(env: Option<crate::ast::Envelope>, sample_rate: u32) -> Self {
        let env = env.unwrap_or(crate::ast::Envelope {
            initial: 15,
            direction: Direction::Down,
            period: 0,
        });
        Self {
            volume: env.initial as i32,
            direction: env.direction,
            period: env.period,
            elapsed_samples: 0,
            sample_rate,
        }
    }

    fn value(&self) -> f32 {
        self.volume as f32 / 15.0
    }

    fn advance_sample(&mut self) {
        if self.period == 0 {
            return;
        }
        self.elapsed_samples += 1;
        let step_samples =
            ((self.period as f64 / 64.0) * self.sample_rate as f64).round().max(1.0) as u32;
        if self.elapsed_samples >= step_samples {
            self.elapsed_samples = 0;
            match self.direction {
                Direction::Up => self.volume = (self.volume + 1).min(15),
                Direction::Down => self.volume = (self.volume - 1).max(0),
            }
        }
    }
}

#[derive(Debug, Clone)]
struct SweepState {
    direction: Direction,
    shift: u8,
    period_samples: u32,
    elapsed_samples: u32,
}

impl SweepState {
    fn new(sweep: crate::ast::Sweep, sample_rate: u32) -> Option<Self> {
        if sweep.time == 0 {
            return None;
        }
        let period_samples = ((sweep.time as f64 / 128.0) * sample_rate as f64).round().max(1.0) as u32;
        Some(Self {
            direction: sweep.direction,
            shift: sweep.shift,
            period_samples,
            elapsed_samples: 0,
        })
    }

    /// Advance one sample; returns `true` if the register left `[0, 2047]`
    /// and the channel should silence.
    fn advance_sample(&mut self, register: &mut u16) -> bool {
        self.elapsed_samples += 1;
        if self.elapsed_samples < self.period_samples {
            return false;
        }
        self.elapsed_samples = 0;
        let delta = *register >> self.shift;
        let updated = match self.direction {
            Direction::Up => *register as i32 + delta as i32,
            Direction::Down => *register as i32 - delta as i32,
        };
        if !(0..=2047).contains(&updated) {
            return true;
        }
        *register = updated as u16;
        false
    }
}

/// Pulse channel generator (pulse1/pulse2). Sweep is only meaningful on
/// pulse1 — a `None` instrument sweep simply leaves it unset.
pub struct PulseGenerator {
    register: u16,
    duty: f32,
    envelope: EnvelopeState,
    sweep: Option<SweepState>,
    phase: f32,
    sample_rate: u32,
    silenced: bool,
}

impl PulseGenerator {
    pub fn new(instrument: &Instrument, midi: i32, sample_rate: u32, warnings: &mut Vec<Warning>) -> Self {
        let register = midi_to_period(midi, warnings);
        let duty = instrument.duty.unwrap_or(0.5).clamp(0.0, 1.0);
        let sweep = instrument
            .sweep
            .and_then(|s| SweepState::new(s, sample_rate));
        Self {
            register,
            duty,
            envelope: EnvelopeState::new(instrument.env, sample_rate),
            sweep,
            phase: 0.0,
            sample_rate,
            silenced: false,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.silenced {
            return 0.0;
        }
        if let Some(sweep) = &mut self.sweep {
            if sweep.advance_sample(&mut self.register) {
                self.silenced = true;
                return 0.0;
            }
        }
        let freq = period_to_freq(self.register);
        self.phase = (self.phase + freq / self.sample_rate as f32).fract();
        let sign = if self.phase < self.duty { 1.0 } else { -1.0 };
        let env = self.envelope.value();
        self.envelope.advance_sample();
        sign * env * OUTPUT_GAIN
    }
}

/// Default Game Boy wave RAM content (a 32-step ramp) used when an
/// instrument omits `wave`.
fn default_wave_table() -> Vec<u8> {
    (0..32)
        .map(|i| if i < 16 { i as u8 } else { (31 - i) as u8 })
        .collect()
}

/// Wavetable channel generator. Unlike pulse/noise, wave volume is a static
/// level (one of 0/25/50/100%), not a stepped envelope.
pub struct WaveGenerator {
    table: Vec<u8>,
    position: f32,
    register: u16,
    sample_rate: u32,
    level_scale: f32,
}

impl WaveGenerator {
    pub fn new(instrument: &Instrument, midi: i32, sample_rate: u32, warnings: &mut Vec<Warning>) -> Self {
        let register = midi_to_period(midi, warnings);
        let table = instrument
            .wave
            .clone()
            .filter(|w| w.len() == 16 || w.len() == 32)
            .unwrap_or_else(default_wave_table);
        let level_scale = match instrument.volume.unwrap_or(100) {
            0 => 0.0,
            25 => 0.25,
            50 => 0.5,
            _ => 1.0,
        };
        Self {
            table,
            position: 0.0,
            register,
            sample_rate,
            level_scale,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let freq = period_to_freq(self.register);
        let n = self.table.len() as f32;
        self.position += freq * n / self.sample_rate as f32;
        if self.position >= n {
            self.position %= n;
        }
        let idx = (self.position as usize).min(self.table.len() - 1);
        let nibble = self.table[idx] as f32;
        let centered = (nibble - 7.5) / 7.5;
        centered * self.level_scale * OUTPUT_GAIN
    }
}

/// Noise channel generator: a deterministic 15- or 7-bit Galois-style LFSR.
pub struct NoiseGenerator {
    lfsr: u16,
    width7: bool,
    divisor: u8,
    shift: u8,
    phase: f64,
    envelope: EnvelopeState,
    sample_rate: u32,
}

impl NoiseGenerator {
    pub fn new(instrument: &Instrument, sample_rate: u32) -> Self {
        Self {
            lfsr: 0x7fff,
            width7: instrument.width == Some(7),
            divisor: instrument.divisor.unwrap_or(1),
            shift: instrument.shift.unwrap_or(0),
            phase: 0.0,
            envelope: EnvelopeState::new(instrument.env, sample_rate),
            sample_rate,
        }
    }

    fn step_lfsr(&mut self) {
        let bit = (self.lfsr & 1) ^ ((self.lfsr >> 1) & 1);
        self.lfsr >>= 1;
        self.lfsr |= bit << 14;
        if self.width7 {
            self.lfsr &= !(1 << 6);
            self.lfsr |= bit << 6;
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let divisor = self.divisor.max(1) as f64;
        let f_lfsr = 4_194_304.0 / (divisor * 2f64.powi(self.shift as i32 + 1));
        self.phase += f_lfsr / self.sample_rate as f64;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            self.step_lfsr();
        }
        let sign = if self.lfsr & 1 == 1 { 1.0 } else { -1.0 };
        let env = self.envelope.value();
        self.envelope.advance_sample();
        sign * env * OUTPUT_GAIN
    }
}

/// A single running channel's generator, dispatched by [`InstrumentType`].
pub enum ChannelGenerator {
    Pulse(PulseGenerator),
    Wave(WaveGenerator),
    Noise(NoiseGenerator),
}

impl ChannelGenerator {
    pub fn new(
        kind: InstrumentType,
        instrument: &Instrument,
        midi: i32,
        sample_rate: u32,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        match kind {
            InstrumentType::Pulse1 | InstrumentType::Pulse2 => {
                ChannelGenerator::Pulse(PulseGenerator::new(instrument, midi, sample_rate, warnings))
            }
            InstrumentType::Wave => {
                ChannelGenerator::Wave(WaveGenerator::new(instrument, midi, sample_rate, warnings))
            }
            InstrumentType::Noise => ChannelGenerator::Noise(NoiseGenerator::new(instrument, sample_rate)),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        match self {
            ChannelGenerator::Pulse(g) => g.next_sample(),
            ChannelGenerator::Wave(g) => g.next_sample(),
            ChannelGenerator::Noise(g) => g.next_sample(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Envelope, Instrument, Sweep};

    #[test]
    fn period_table_is_72_entries_and_monotonic_descending() {
        let table = period_table();
        assert_eq!(table.len(), 72);
        for pair in table.windows(2) {
            assert!(pair[0] > pair[1], "period should decrease as pitch rises");
        }
    }

    #[test]
    fn out_of_range_note_clamps_and_warns() {
        let mut warnings = Vec::new();
        let low = midi_to_period(TABLE_MIN_MIDI - 12, &mut warnings);
        assert_eq!(low, period_table()[0]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn c3_frequency_is_261_hz() {
        let mut warnings = Vec::new();
        let freq = midi_to_freq(36, &mut warnings);
        assert!(warnings.is_empty());
        assert!((freq - 261.0).abs() < 2.0, "freq was {freq}");
    }

    #[test]
    fn uge_note_index_maps_c3_to_zero() {
        assert_eq!(uge_note_index(36), 0);
    }

    #[test]
    fn equal_power_pan_center_is_unity_gain_both_sides() {
        let (l, r) = equal_power_pan(Pan::Enum(PanEnum::C));
        assert!((l - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((r - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn equal_power_pan_hard_left_silences_right() {
        let (l, r) = equal_power_pan(Pan::Enum(PanEnum::L));
        assert!(l > 0.99);
        assert!(r < 0.01);
    }

    #[test]
    fn pulse_generator_output_stays_in_range() {
        let mut instrument = Instrument::new("lead", InstrumentType::Pulse1);
        instrument.duty = Some(0.5);
        instrument.env = Some(Envelope {
            initial: 15,
            direction: Direction::Down,
            period: 2,
        });
        let mut warnings = Vec::new();
        let mut gen = PulseGenerator::new(&instrument, 60, 44100, &mut warnings);
        for _ in 0..1000 {
            let s = gen.next_sample();
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn sweep_silences_channel_when_register_overflows() {
        let mut instrument = Instrument::new("siren", InstrumentType::Pulse1);
        instrument.duty = Some(0.5);
        instrument.sweep = Some(Sweep {
            time: 1,
            direction: Direction::Up,
            shift: 0,
        });
        let mut warnings = Vec::new();
        // A high note starts close to the top of the period range; an
        // aggressive upward sweep should push it past 2047 quickly.
        let mut gen = PulseGenerator::new(&instrument, 95, 44100, &mut warnings);
        let mut silenced = false;
        for _ in 0..44100 {
            if gen.next_sample() == 0.0 && gen.silenced {
                silenced = true;
                break;
            }
        }
        assert!(silenced);
    }

    #[test]
    fn noise_lfsr_is_deterministic_given_same_params() {
        let instrument = Instrument::new("hat", InstrumentType::Noise);
        let mut a = NoiseGenerator::new(&instrument, 44100);
        let mut b = NoiseGenerator::new(&instrument, 44100);
        let seq_a: Vec<f32> = (0..500).map(|_| a.next_sample()).collect();
        let seq_b: Vec<f32> = (0..500).map(|_| b.next_sample()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn wave_generator_default_table_is_symmetric_ramp() {
        let instrument = Instrument::new("arp", InstrumentType::Wave);
        let mut warnings = Vec::new();
        let mut gen = WaveGenerator::new(&instrument, 48, 44100, &mut warnings);
        for _ in 0..1000 {
            let s = gen.next_sample();
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn wave_volume_zero_percent_is_silent() {
        let mut instrument = Instrument::new("muted", InstrumentType::Wave);
        instrument.volume = Some(0);
        let mut warnings = Vec::new();
        let mut gen = WaveGenerator::new(&instrument, 48, 44100, &mut warnings);
        for _ in 0..200 {
            assert_eq!(gen.next_sample(), 0.0);
        }
    }
}
