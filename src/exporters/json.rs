//! # JSON Export
//!
//! A thin `serde_json` serialization of the resolved song, plus an
//! `effectMeta` table describing each known effect kind's parameter names —
//! added so consumers that don't share this crate's `Effect` enum can still
//! label `params` positionally.

use crate::error::{GbscoreError, Result};
use crate::resolver::ResolvedSong;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct EffectMeta {
    kind: &'static str,
    params: &'static [&'static str],
}

const EFFECT_META: &[EffectMeta] = &[
    EffectMeta { kind: "pan", params: &["value"] },
    EffectMeta { kind: "vib", params: &["depth", "rate", "shape"] },
    EffectMeta { kind: "port", params: &["speed", "duration"] },
    EffectMeta { kind: "trem", params: &["depth", "rate", "waveform"] },
    EffectMeta { kind: "volslide", params: &["delta", "steps"] },
    EffectMeta { kind: "bend", params: &["semitones", "curve", "delay", "time"] },
    EffectMeta { kind: "cut", params: &["ticks"] },
    EffectMeta { kind: "arp", params: &["offsets"] },
    EffectMeta { kind: "retrig", params: &["interval", "volDelta"] },
    EffectMeta { kind: "echo", params: &["delay", "feedback", "mix"] },
];

/// Serialize a [`ResolvedSong`] to pretty-printed JSON, with `exportedAt`
/// (RFC 3339, UTC) and the static `effectMeta` table alongside it.
pub fn export_json(song: &ResolvedSong) -> Result<Vec<u8>> {
    let value = json!({
        "exportedAt": Utc::now().to_rfc3339(),
        "song": song,
        "effectMeta": EFFECT_META,
    });
    serde_json::to_vec_pretty(&value)
        .map_err(|e| GbscoreError::Export { format: "json", message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PlayMode, SongMetadata};
    use crate::resolver::{ChannelEvent, ResolvedChannel};
    use std::collections::HashMap;

    #[test]
    fn export_includes_effect_meta_and_timestamp() {
        let song = ResolvedSong {
            chip: "gameboy".to_string(),
            bpm: 120,
            volume: 1.0,
            play: PlayMode::default(),
            metadata: SongMetadata::default(),
            instruments: HashMap::new(),
            channels: vec![ResolvedChannel {
                id: 1,
                speed: None,
                default_instrument: None,
                events: vec![ChannelEvent::Rest],
            }],
        };
        let bytes = export_json(&song).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.get("exportedAt").is_some());
        assert!(parsed["effectMeta"].as_array().unwrap().iter().any(|e| e["kind"] == "vib"));
        assert_eq!(parsed["song"]["bpm"], 120);
    }
}
