//! # Exporters (C5)
//!
//! Four interchange formats share the same [`crate::resolver::ResolvedSong`]
//! input but otherwise have little in common: [`wav`] renders PCM through
//! [`crate::render`] and writes it with `hound`; [`midi`] and [`uge`] hand-roll
//! their binary layouts with `byteorder` (no crate in the ecosystem models
//! SMF-with-GB-specific-metadata or hUGEtracker's v6 format); [`json`] is a
//! thin `serde_json` serialization of the resolved song plus an export-time
//! `effectMeta` table.

pub mod json;
pub mod midi;
pub mod uge;
pub mod wav;
