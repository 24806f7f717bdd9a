//! # Score Parser (C1)
//!
//! Parses score source text into an [`AbstractScore`]. The grammar is line-oriented
//! (see [`crate::lexer`]): each logical line is one directive, pattern, sequence,
//! arrangement row group, channel, instrument, effect preset, or import.
//!
//! ## Two-Pass Structure
//!
//! The parser walks logical lines in a single pass, but pattern bodies are eagerly
//! expanded during that pass (grouping, repetition, and name-level modifiers — see
//! [`crate::expander`]) while sequence bodies are stored as raw [`SeqItem`] references.
//! Sequences can forward-reference patterns or other sequences declared later in the
//! source, so their expansion is deferred to the resolver; patterns cannot reference
//! anything, so there is no such ordering hazard for them.
//!
//! ## Validation
//!
//! After the walk, [`parse`] checks the invariants that require the whole score:
//! unique channel IDs, wave volume range, and an acyclic, fully-resolvable
//! pattern/sequence reference graph. Validation failures that have a natural
//! fallback (e.g. `sweep` on a non-pulse1 instrument) are collected as
//! [`Warning`]s instead of aborting the parse.
//!
//! ## Related Modules
//! - `lexer` - splits source into logical lines and tokens
//! - `ast` - the types this module builds
//! - `expander` - eager pattern expansion, and the reference-graph check reused here

use crate::ast::*;
use crate::error::{GbscoreError, Result, Warning};
use crate::expander::{expand_tokens, Expander};
use crate::lexer::{logical_lines, split_colons, split_commas, split_once_top_level, split_tokens, LogicalLine};

/// Parse score source text into an [`AbstractScore`] plus accumulated warnings.
pub fn parse(source: &str) -> Result<(AbstractScore, Vec<Warning>)> {
    let lines = logical_lines(source);
    let mut score = AbstractScore::default();
    let mut warnings = Vec::new();

    let mut i = 0usize;
    while i < lines.len() {
        let line = &lines[i];
        let keyword = line.text.split_whitespace().next().unwrap_or("");

        match keyword {
            "chip" => score.chip = directive_value(line, "chip")?.to_string(),
            "bpm" => {
                let raw = directive_value(line, "bpm")?;
                score.bpm = raw.parse::<u32>().map_err(|_| parse_error(line, format!("invalid bpm `{raw}`")))?;
            }
            "volume" => {
                let raw = directive_value(line, "volume")?;
                let v: f32 = raw
                    .parse()
                    .map_err(|_| parse_error(line, format!("invalid volume `{raw}`")))?;
                score.volume = v.clamp(0.0, 1.0);
            }
            "play" => score.play = parse_play(&line.text),
            "song" => parse_song(&line.text, &mut score.metadata)?,
            "pat" => parse_pattern(line, &mut score)?,
            "seq" => parse_sequence(line, &mut score)?,
            "arrange" => {
                let (name, rows, consumed) = collect_arrange_block(&lines, i)?;
                score.arrangements.insert(name, rows);
                i += consumed;
                continue;
            }
            "channel" => {
                let decl = parse_channel(line)?;
                score.channels.push(decl);
            }
            "inst" => {
                let inst = parse_instrument(line)?;
                score.instruments.insert(inst.name.clone(), inst);
            }
            "effect" => parse_effect(line, &mut score)?,
            "import" => parse_import(line, &mut score)?,
            "" => {}
            other => {
                return Err(parse_error(line, format!("unrecognized directive `{other}`")));
            }
        }
        i += 1;
    }

    validate(&mut score, &mut warnings)?;
    Ok((score, warnings))
}

fn parse_error(line: &LogicalLine, message: impl Into<String>) -> GbscoreError {
    GbscoreError::Parse {
        line: line.line,
        column: line.column,
        message: message.into(),
    }
}

/// Extract the value of a `keyword value` / `keyword=value` directive.
fn directive_value<'a>(line: &'a LogicalLine, keyword: &str) -> Result<&'a str> {
    let rest = line
        .text
        .strip_prefix(keyword)
        .ok_or_else(|| parse_error(line, format!("expected `{keyword}` directive")))?;
    let rest = rest.trim_start_matches('=').trim();
    Ok(rest)
}

fn parse_play(text: &str) -> PlayMode {
    let rest = text.strip_prefix("play").unwrap_or("");
    let mut mode = PlayMode::default();
    for word in rest.split_whitespace() {
        match word {
            "auto" => mode.auto = true,
            "repeat" => mode.repeat = true,
            _ => {}
        }
    }
    mode
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    for q in ["\"\"\"", "\"", "'"] {
        if s.starts_with(q) && s.ends_with(q) && s.len() >= 2 * q.len() {
            return s[q.len()..s.len() - q.len()].trim().to_string();
        }
    }
    s.to_string()
}

fn parse_song(text: &str, metadata: &mut SongMetadata) -> Result<()> {
    let rest = text.strip_prefix("song").unwrap_or("").trim_start();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let key = parts.next().unwrap_or("").trim();
    let value = strip_quotes(parts.next().unwrap_or("").trim());
    match key {
        "name" => metadata.name = Some(value),
        "artist" => metadata.artist = Some(value),
        "description" => metadata.description = Some(value),
        "tags" => metadata.tags = value.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        _ => {
            return Err(GbscoreError::Parse {
                line: 0,
                column: 0,
                message: format!("unknown song metadata key `{key}`"),
            })
        }
    }
    Ok(())
}

/// Parse a `NAME[:mod]*` left-hand side into a bare name and its modifier chain.
fn parse_name_with_modifiers(lhs: &str) -> (String, Vec<String>) {
    let mut parts = split_colons(lhs.trim());
    if parts.is_empty() {
        return (String::new(), Vec::new());
    }
    let name = parts.remove(0);
    (name, parts)
}

/// Parse a single `NAME:mod1:mod2` reference token into a [`SeqItem`].
fn parse_seq_item(token: &str) -> SeqItem {
    let (name, modifiers) = parse_name_with_modifiers(token);
    SeqItem::new(name, modifiers)
}

fn parse_pattern(line: &LogicalLine, score: &mut AbstractScore) -> Result<()> {
    let rest = line.text.strip_prefix("pat").unwrap_or("").trim();
    let (lhs, rhs) = split_once_top_level(rest, '=')
        .ok_or_else(|| parse_error(line, "pattern definition missing `=`"))?;
    let (name, modifiers) = parse_name_with_modifiers(&lhs);
    if name.is_empty() {
        return Err(parse_error(line, "pattern definition missing a name"));
    }
    let raw_tokens = if rhs.trim_start().starts_with('"') || rhs.trim_start().starts_with('\'') {
        strip_quotes(&rhs).split_whitespace().map(String::from).collect::<Vec<_>>()
    } else {
        split_tokens(&rhs)
    };
    let expanded = expand_tokens(&raw_tokens, &modifiers)?;
    score.patterns.insert(name, expanded);
    Ok(())
}

fn parse_sequence(line: &LogicalLine, score: &mut AbstractScore) -> Result<()> {
    let rest = line.text.strip_prefix("seq").unwrap_or("").trim();
    let (lhs, rhs) = split_once_top_level(rest, '=')
        .ok_or_else(|| parse_error(line, "sequence definition missing `=`"))?;
    let (name, _modifiers) = parse_name_with_modifiers(&lhs);
    if name.is_empty() {
        return Err(parse_error(line, "sequence definition missing a name"));
    }
    let items = split_tokens(&rhs).iter().map(|t| parse_seq_item(t)).collect();
    score.sequences.insert(name, items);
    Ok(())
}

fn parse_channel(line: &LogicalLine) -> Result<ChannelDecl> {
    let rest = line.text.strip_prefix("channel").unwrap_or("").trim();
    let (id_str, after_id) = rest
        .split_once("=>")
        .map(|(a, b)| (a.trim(), b.trim()))
        .ok_or_else(|| parse_error(line, "channel declaration missing `=>`"))?;
    let id: u8 = id_str
        .parse()
        .map_err(|_| parse_error(line, format!("invalid channel id `{id_str}`")))?;

    let tokens = split_tokens(after_id);
    let mut default_instrument = None;
    let mut speed = None;
    let mut spec_tokens: Vec<String> = Vec::new();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let tok = tokens[idx].as_str();
        match tok {
            "inst" => {
                idx += 1;
                default_instrument = tokens.get(idx).cloned();
            }
            "pat" | "seq" => {
                // Informational keyword; the actual spec tokens follow.
            }
            "speed" => {
                idx += 1;
                if let Some(v) = tokens.get(idx) {
                    speed = v.parse::<f32>().ok();
                }
            }
            t if t.starts_with("speed=") => {
                speed = t.trim_start_matches("speed=").parse::<f32>().ok();
            }
            "bpm" => {
                return Err(parse_error(line, "channel-level bpm is not allowed; set bpm once at the score level"));
            }
            t => spec_tokens.push(t.to_string()),
        }
        idx += 1;
    }

    if let Some(s) = speed {
        if !(0.25..=8.0).contains(&s) {
            return Err(parse_error(line, format!("channel speed `{s}` out of range 0.25..8")));
        }
    }

    Ok(ChannelDecl {
        id,
        default_instrument,
        items: spec_tokens.iter().map(|t| parse_seq_item(t)).collect(),
        speed,
    })
}

fn parse_number_list(raw: &str) -> Vec<u8> {
    raw.split(',')
        .filter_map(|p| p.trim().parse::<u8>().ok())
        .collect()
}

fn parse_envelope(raw: &str) -> Option<Envelope> {
    let raw = raw.strip_prefix("gb:").unwrap_or(raw);
    let parts: Vec<&str> = raw.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 {
        return None;
    }
    let initial: u8 = parts[0].parse().ok()?;
    let direction = Direction::from_str(parts[1])?;
    let period: u8 = parts[2].parse().ok()?;
    Some(Envelope { initial, direction, period })
}

fn parse_sweep(raw: &str) -> Option<Sweep> {
    let parts: Vec<&str> = raw.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 {
        return None;
    }
    let time: u8 = parts[0].parse().ok()?;
    let direction = Direction::from_str(parts[1])?;
    let shift: u8 = parts[2].parse().ok()?;
    Some(Sweep { time, direction, shift })
}

fn parse_duty(raw: &str) -> Option<f32> {
    let raw = raw.trim().trim_end_matches('%');
    let v: f32 = raw.parse().ok()?;
    Some(if v > 1.0 { v / 100.0 } else { v })
}

fn parse_volume_percent(raw: &str, line: &LogicalLine) -> Result<u8> {
    let raw = raw.trim().trim_end_matches('%');
    let v: u8 = raw
        .parse()
        .map_err(|_| parse_error(line, format!("invalid volume `{raw}`")))?;
    if matches!(v, 0 | 25 | 50 | 100) {
        Ok(v)
    } else {
        Err(parse_error(line, format!("wave volume must be one of 0/25/50/100, got {v}")))
    }
}

fn parse_instrument(line: &LogicalLine) -> Result<Instrument> {
    let rest = line.text.strip_prefix("inst").unwrap_or("").trim();
    let tokens = split_tokens(rest);
    let mut iter = tokens.into_iter();
    let name = iter.next().ok_or_else(|| parse_error(line, "instrument declaration missing a name"))?;

    let mut kind = None;

    // `type=...` can appear anywhere in the property list, but we need it first
    // to construct the Instrument; buffer the rest and replay once it's found.
    let mut pending: Vec<(String, String)> = Vec::new();
    for tok in iter {
        if let Some((key, value)) = split_once_top_level(&tok, '=') {
            if key == "type" {
                kind = InstrumentType::from_str(value.trim());
                if kind.is_none() {
                    return Err(parse_error(line, format!("unknown instrument type `{value}`")));
                }
            } else {
                pending.push((key, value));
            }
        }
    }
    let kind = kind.ok_or_else(|| parse_error(line, "instrument declaration missing `type=`"))?;
    let mut instrument = Instrument::new(name, kind);

    for (key, value) in pending {
        match key.as_str() {
            "duty" => instrument.duty = parse_duty(&value),
            "env" => instrument.env = parse_envelope(&value),
            "sweep" => instrument.sweep = parse_sweep(&value),
            "wave" => instrument.wave = Some(parse_number_list(&value)),
            "width" => instrument.width = value.parse().ok(),
            "divisor" => instrument.divisor = value.parse().ok(),
            "shift" => instrument.shift = value.parse().ok(),
            "volume" | "vol" => instrument.volume = Some(parse_volume_percent(&value, line)?),
            "pan" => instrument.pan = Pan::from_str(&value),
            "note" => instrument.note = parse_note_token(&value),
            "gm" => instrument.gm = value.parse().ok(),
            _ => {}
        }
    }

    Ok(instrument)
}

fn parse_effect(line: &LogicalLine, score: &mut AbstractScore) -> Result<()> {
    let rest = line.text.strip_prefix("effect").unwrap_or("").trim();
    let (lhs, rhs) = split_once_top_level(rest, '=')
        .ok_or_else(|| parse_error(line, "effect definition missing `=`"))?;
    let name = lhs.trim().to_string();
    let (kind, params_raw) = split_once_top_level(&rhs, ':').unwrap_or((rhs.trim().to_string(), String::new()));
    let params = split_commas(&params_raw)
        .into_iter()
        .filter_map(|p| EffectParam::parse(&p))
        .collect();
    score.effects.insert(name, EffectSpec { kind: kind.trim().to_string(), params });
    Ok(())
}

fn parse_import(line: &LogicalLine, score: &mut AbstractScore) -> Result<()> {
    let rest = line.text.strip_prefix("import").unwrap_or("").trim();
    let spec = strip_quotes(rest);
    if spec.is_empty() {
        return Err(parse_error(line, "import missing a path or URL"));
    }
    score.imports.push(spec);
    Ok(())
}

/// Parse a single arrange row's text (`[defaults(inst=NAME)] slot1 slot2 slot3 slot4`).
fn parse_arrange_row(text: &str) -> ArrangeRow {
    let mut row = ArrangeRow::default();
    let tokens = split_tokens(text.trim());
    let mut slot_idx = 0usize;
    for tok in tokens {
        if let Some(arg) = tok.strip_prefix("defaults(").and_then(|r| r.strip_suffix(')')) {
            if let Some((key, value)) = split_once_top_level(arg, '=') {
                if key.trim() == "inst" {
                    row.defaults_inst = Some(value.trim().to_string());
                }
            }
            continue;
        }
        if slot_idx >= 4 {
            continue;
        }
        row.slots[slot_idx] = if tok == "." || tok == "-" {
            None
        } else {
            Some(parse_seq_item(&tok))
        };
        slot_idx += 1;
    }
    row
}

/// Collect a (possibly multi-line) `arrange NAME = ...` block starting at `lines[start]`.
/// Returns the name, parsed rows, and the number of source lines consumed.
fn collect_arrange_block(lines: &[LogicalLine], start: usize) -> Result<(String, Vec<ArrangeRow>, usize)> {
    let header = &lines[start];
    let rest = header.text.strip_prefix("arrange").unwrap_or("").trim();
    let (name, body) = split_once_top_level(rest, '=')
        .ok_or_else(|| parse_error(header, "arrange block missing `=`"))?;

    let mut joined = body.trim().to_string();
    let mut consumed = 1usize;
    let mut idx = start + 1;
    const KEYWORDS: &[&str] = &["chip", "bpm", "volume", "play", "song", "pat", "seq", "arrange", "channel", "inst", "effect", "import"];
    loop {
        if idx >= lines.len() {
            break;
        }
        let next_keyword = lines[idx].text.split_whitespace().next().unwrap_or("");
        if KEYWORDS.contains(&next_keyword) && !joined.trim_end().ends_with(',') {
            break;
        }
        if !joined.trim().is_empty() {
            joined.push(',');
        }
        joined.push_str(&lines[idx].text);
        consumed += 1;
        idx += 1;
    }

    let rows = split_commas(&joined)
        .into_iter()
        .filter(|r| !r.trim().is_empty())
        .map(|r| parse_arrange_row(&r))
        .collect();

    Ok((name.trim().to_string(), rows, consumed))
}

/// Whole-score validation: unique channel IDs, wave volume range (already
/// enforced at parse time, rechecked here for defense in depth), sweep-on-pulse1,
/// and an acyclic, fully-resolvable pattern/sequence reference graph.
fn validate(score: &mut AbstractScore, warnings: &mut Vec<Warning>) -> Result<()> {
    let mut seen_ids = std::collections::HashSet::new();
    for ch in &score.channels {
        if !(1..=4).contains(&ch.id) {
            return Err(GbscoreError::Validation {
                context: format!("channel {}", ch.id),
                message: "channel id must be in 1..=4".to_string(),
            });
        }
        if !seen_ids.insert(ch.id) {
            return Err(GbscoreError::Validation {
                context: format!("channel {}", ch.id),
                message: "duplicate channel id".to_string(),
            });
        }
    }

    for inst in score.instruments.values() {
        if inst.sweep.is_some() && inst.kind != InstrumentType::Pulse1 {
            warnings.push(Warning::new(
                format!("instrument `{}`", inst.name),
                "sweep is only meaningful on pulse1; ignored at render time",
            ));
        }
    }

    let expander = Expander::new(&score.sequences, &score.patterns);
    expander.expand_all()?;
    for ch in &score.channels {
        expander.resolve_items(&ch.items)?;
    }
    for rows in score.arrangements.values() {
        for row in rows {
            for slot in row.slots.iter().flatten() {
                expander.resolve_items(std::slice::from_ref(slot))?;
            }
        }
    }

    Ok(())
}
