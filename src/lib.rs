//! # gbscore
//!
//! A compiler and renderer for a small text-based live-coding music
//! notation, targeting the Game Boy's four-channel APU (2 pulse, 1 wave,
//! 1 noise).
//!
//! ## Compilation pipeline
//!
//! ```text
//! source → Lexer → Parser → Pattern Expander → Resolver → {Renderer, Exporters}
//! ```
//!
//! 1. **Lexer** ([`lexer`]) - tokenizes source text with location info
//! 2. **Parser** ([`parser`]) - parses tokens into an [`ast::AbstractScore`]
//! 3. **Expander** ([`expander`]) - expands `pat`/`seq`/`arrange` bodies
//!    (repeat counts, note groups) into flat token streams
//! 4. **Resolver** ([`resolver`]) - runs the expander per channel and
//!    resolves instrument overrides into a [`resolver::ResolvedSong`]
//! 5. **APU core** ([`apu`]) - Game Boy channel generators (pulse/wave/
//!    noise), envelopes, sweep, period tables
//! 6. **Renderer** ([`render`]) - mixes a [`resolver::ResolvedSong`] down
//!    to an interleaved PCM float buffer
//! 7. **Exporters** ([`exporters`]) - WAV, Standard MIDI File, hUGETracker
//!    `.uge`, and JSON output
//! 8. **Imports** ([`imports`]) - resolves `import` directives (local file
//!    or remote URL) behind an injectable [`imports::Fetcher`]
//!
//! ## Quick start
//!
//! ```rust
//! use gbscore::{compile, render_pcm, export_wav, RenderOptions, WavOptions};
//!
//! let source = "pat A = C4 D4 E4 F4\nbpm 120\nchannel 1 => pat A\n";
//! let (song, _warnings) = compile(source)?;
//! let (pcm, _) = render_pcm(&song, &RenderOptions::default());
//! assert!(!pcm.is_empty());
//!
//! let (wav_bytes, _) = export_wav(&song, &RenderOptions::default(), &WavOptions::default())?;
//! assert_eq!(&wav_bytes[0..4], b"RIFF");
//! # Ok::<(), gbscore::GbscoreError>(())
//! ```
//!
//! ## Language overview
//!
//! - `chip gameboy` / `bpm 120` / `volume 0.8` - global directives
//! - `inst lead type=pulse1 envelope=...` - instrument declarations
//! - `pat NAME = C4 D4 . E4 (G4 A4)*2` - a reusable note pattern
//! - `seq NAME = A B:oct(-1)` - a sequence of pattern references
//! - `arrange NAME = ...` - a full arrangement, one row per line
//! - `channel <id> => [inst <name>] (pat|seq) <NAME> [speed=<n>]` -
//!   binds a channel to a previously-declared pattern or sequence
//! - `effect ...` / `import "path"` - per-event effects and instrument
//!   library imports
//!
//! ## Module structure
//!
//! - [`ast`] - abstract syntax tree types (`AbstractScore`, `Instrument`, ...)
//! - [`error`] - [`GbscoreError`] and [`error::Warning`]
//! - [`lexer`] - tokenization
//! - [`parser`] - parsing (`Vec<Token>` → `AbstractScore`)
//! - [`expander`] - pattern/sequence/arrangement expansion (C2)
//! - [`resolver`] - instrument-override resolution (C3)
//! - [`apu`] - Game Boy APU channel generators (C4)
//! - [`render`] - PCM mixdown (C4)
//! - [`exporters`] - WAV/MIDI/UGE/JSON output (C5)
//! - [`imports`] - instrument library imports (§10.3)

pub mod apu;
pub mod ast;
pub mod error;
pub mod exporters;
pub mod expander;
pub mod imports;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod resolver;

pub mod api;

pub use ast::*;
pub use error::*;

pub use api::{compile, export_json, export_midi, export_uge, export_wav, parse, render_pcm, resolve};
pub use exporters::midi::MidiOptions;
pub use exporters::uge::UgeOptions;
pub use exporters::wav::{BitDepth, WavOptions};
pub use imports::{Fetcher, ImportConfig, NullFetcher};
pub use render::{ChannelCount, RenderOptions};
pub use resolver::ResolvedSong;
