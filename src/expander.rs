//! # Pattern Expander (C2)
//!
//! Expands pattern and sequence token arrays: grouping/repetition syntax first,
//! then the documented modifier chain (`oct`, a bare transpose, `rev`, `slow`,
//! `fast`, `inst`, `pan`) in left-to-right order. Composable and referentially
//! transparent — the same tokens and modifiers always expand to the same output.
//!
//! [`expand_tokens`] handles a single token array plus its modifier chain.
//! [`Expander`] handles the sequence-reference graph: a `seq` item names another
//! pattern or sequence, optionally with its own modifier chain, and those names
//! must be resolved — with cycle detection — before `expand_tokens` can run on
//! the result.

use crate::ast::{parse_note_token, SeqItem};
use crate::error::{GbscoreError, Result};
use crate::lexer::split_tokens;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Expand grouping/repetition syntax in a single token: `(X Y)*N` / `(X Y)` →
/// N repetitions of the inner tokens (recursively expanded for nested groups);
/// `tok*N` / `tok:N` → N copies of `tok`. `N == 0` yields the empty sequence.
fn expand_grouping(token: &str) -> Result<Vec<String>> {
    if let Some(rest) = token.strip_prefix('(') {
        let close = find_matching_close(rest, '(', ')').ok_or_else(|| GbscoreError::Parse {
            line: 0,
            column: 0,
            message: format!("unterminated group in token `{token}`"),
        })?;
        let inner = &rest[..close];
        let suffix = &rest[close + 1..];
        let count = parse_trailing_count(suffix)?;
        let mut expanded_inner = Vec::new();
        for t in split_tokens(inner) {
            expanded_inner.extend(expand_grouping(&t)?);
        }
        let mut out = Vec::with_capacity(expanded_inner.len() * count);
        for _ in 0..count {
            out.extend(expanded_inner.iter().cloned());
        }
        Ok(out)
    } else {
        let (base, count) = parse_trailing_repeat(token);
        Ok(std::iter::repeat(base.to_string()).take(count).collect())
    }
}

/// Index of the `)` matching the `(` that was already consumed, within `s`
/// (which starts right after that `(`).
fn find_matching_close(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 1i32;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Parse a `*N` suffix immediately following a closed group; empty suffix means N=1.
fn parse_trailing_count(suffix: &str) -> Result<usize> {
    if suffix.is_empty() {
        return Ok(1);
    }
    let digits = suffix.strip_prefix('*').or_else(|| suffix.strip_prefix(':'));
    match digits {
        Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()) => {
            Ok(d.parse().unwrap_or(1))
        }
        _ => Err(GbscoreError::Parse {
            line: 0,
            column: 0,
            message: format!("invalid repeat suffix `{suffix}`"),
        }),
    }
}

/// Split a plain (non-group) token into its base and a trailing `*N`/`:N` repeat
/// count, defaulting to 1 copy when no such suffix is present.
fn parse_trailing_repeat(token: &str) -> (&str, usize) {
    for sep in ['*', ':'] {
        if let Some(pos) = token.rfind(sep) {
            let (base, suffix) = token.split_at(pos);
            let digits = &suffix[1..];
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(n) = digits.parse::<usize>() {
                    return (base, n);
                }
            }
        }
    }
    (token, 1)
}

/// Parse a single `(K)`-style modifier argument, e.g. the `K` in `oct(K)`.
fn modifier_arg(modifier: &str, name: &str) -> Result<String> {
    let rest = modifier
        .strip_prefix(name)
        .and_then(|r| r.strip_prefix('('))
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| GbscoreError::Parse {
            line: 0,
            column: 0,
            message: format!("malformed modifier `{modifier}`"),
        })?;
    Ok(rest.to_string())
}

fn parse_int_arg(modifier: &str, name: &str, default: i32) -> Result<i32> {
    let arg = modifier_arg(modifier, name)?;
    if arg.is_empty() {
        return Ok(default);
    }
    arg.parse::<i32>().map_err(|_| GbscoreError::Parse {
        line: 0,
        column: 0,
        message: format!("non-numeric argument in `{modifier}`"),
    })
}

fn is_bare_transpose(modifier: &str) -> bool {
    let mut chars = modifier.chars();
    match chars.next() {
        Some('+') | Some('-') => chars.as_str().chars().all(|c| c.is_ascii_digit()) && !chars.as_str().is_empty(),
        Some(c) if c.is_ascii_digit() => modifier.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Apply the documented modifier chain to an already grouping-expanded token
/// array. Grouping/repetition syntax is expanded unconditionally first (it is
/// not gated on the modifier list being non-empty).
pub fn expand_tokens(tokens: &[String], modifiers: &[String]) -> Result<Vec<String>> {
    let mut flat = Vec::new();
    for t in tokens {
        flat.extend(expand_grouping(t)?);
    }

    let mut pending_octaves = 0i32;
    let mut pending_semitones = 0i32;
    let mut inst_override: Option<String> = None;
    let mut hit_count: Option<String> = None;

    for modifier in modifiers {
        if modifier == "rev" {
            flat.reverse();
        } else if let Some(arg) = modifier
            .strip_prefix("slow")
            .and_then(|r| r.strip_prefix('('))
            .and_then(|r| r.strip_suffix(')'))
        {
            let factor: usize = if arg.is_empty() {
                2
            } else {
                arg.parse().unwrap_or(2)
            };
            let mut inflated = Vec::with_capacity(flat.len() * factor.max(1));
            for t in &flat {
                for _ in 0..factor {
                    inflated.push(t.clone());
                }
            }
            flat = inflated;
        } else if let Some(arg) = modifier
            .strip_prefix("fast")
            .and_then(|r| r.strip_prefix('('))
            .and_then(|r| r.strip_suffix(')'))
        {
            let factor: usize = if arg.is_empty() {
                2
            } else {
                arg.parse().unwrap_or(2)
            };
            flat = flat
                .into_iter()
                .step_by(factor.max(1))
                .collect();
        } else if modifier.starts_with("oct(") {
            pending_octaves += parse_int_arg(modifier, "oct", 0)?;
        } else if modifier.starts_with("semitone(") {
            pending_semitones += parse_int_arg(modifier, "semitone", 0)?;
        } else if modifier.starts_with("st(") {
            pending_semitones += parse_int_arg(modifier, "st", 0)?;
        } else if modifier.starts_with("trans(") {
            pending_semitones += parse_int_arg(modifier, "trans", 0)?;
        } else if is_bare_transpose(modifier) {
            pending_semitones += modifier.parse::<i32>().unwrap_or(0);
        } else if let Some(name) = modifier
            .strip_prefix("inst")
            .and_then(|r| r.strip_prefix('('))
            .and_then(|r| r.strip_suffix(')'))
        {
            let name = name.split(',').next().unwrap_or("").trim();
            inst_override = Some(name.to_string());
        } else if let Some(arg) = modifier
            .strip_prefix("pan")
            .and_then(|r| r.strip_prefix('('))
            .and_then(|r| r.strip_suffix(')'))
        {
            hit_count = None; // suppress unused warning without weakening the branch below
            let _ = &hit_count;
            flat.insert(0, format!("pan({arg})"));
            flat.push("pan()".to_string());
        }
        // Unknown modifiers are ignored: the grammar is intentionally open to
        // forward-compatible preset names resolved elsewhere (effect table).
    }

    if pending_octaves != 0 || pending_semitones != 0 {
        flat = flat
            .into_iter()
            .map(|t| match parse_note_token(&t) {
                Some(pitch) => pitch.transposed(pending_octaves, pending_semitones).to_string(),
                None => t,
            })
            .collect();
    } else {
        // Canonicalize flat spelling to sharps even with a net-zero transpose,
        // so modifier-free pattern storage already matches the documented
        // example outputs (§8 E1).
        flat = flat
            .into_iter()
            .map(|t| match parse_note_token(&t) {
                Some(pitch) => pitch.transposed(0, 0).to_string(),
                None => t,
            })
            .collect();
    }

    if let Some(name) = inst_override {
        flat.insert(0, format!("inst({name})"));
    }

    Ok(flat)
}

/// Resolves `seq`/pattern name references (with cycle detection) and expands
/// each into a flat token array, memoizing per source-resolved name.
pub struct Expander<'a> {
    sequences: &'a HashMap<String, Vec<SeqItem>>,
    patterns: &'a HashMap<String, Vec<String>>,
    cache: RefCell<HashMap<String, Vec<String>>>,
}

impl<'a> Expander<'a> {
    pub fn new(
        sequences: &'a HashMap<String, Vec<SeqItem>>,
        patterns: &'a HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            sequences,
            patterns,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve a bare name: sequence first, then pattern, then a literal
    /// single-token fallback (so note literals can appear directly in a `seq`).
    fn resolve_name(&self, name: &str, visiting: &mut HashSet<String>) -> Result<Vec<String>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }
        if visiting.contains(name) {
            return Err(GbscoreError::Resolution {
                channel: 0,
                index: 0,
                message: format!("cyclic reference involving `{name}`"),
            });
        }
        if let Some(items) = self.sequences.get(name) {
            visiting.insert(name.to_string());
            let mut out = Vec::new();
            for item in items {
                let base = self.resolve_name(&item.name, visiting)?;
                out.extend(expand_tokens(&base, &item.modifiers)?);
            }
            visiting.remove(name);
            self.cache.borrow_mut().insert(name.to_string(), out.clone());
            Ok(out)
        } else if let Some(tokens) = self.patterns.get(name) {
            Ok(tokens.clone())
        } else {
            Ok(vec![name.to_string()])
        }
    }

    /// Resolve and expand an item list (a channel spec, an arrangement slot, or
    /// the right-hand side of a `seq`), in order.
    pub fn resolve_items(&self, items: &[SeqItem]) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for item in items {
            let mut visiting = HashSet::new();
            let base = self.resolve_name(&item.name, &mut visiting)?;
            out.extend(expand_tokens(&base, &item.modifiers)?);
        }
        Ok(out)
    }

    /// Compute a name -> expanded-tokens mapping for every declared sequence
    /// (used by tests and by [`crate::api::parse`] to validate the reference
    /// graph is acyclic up front).
    pub fn expand_all(&self) -> Result<HashMap<String, Vec<String>>> {
        let mut result = HashMap::new();
        for name in self.sequences.keys() {
            let mut visiting = HashSet::new();
            result.insert(name.clone(), self.resolve_name(name, &mut visiting)?);
        }
        Ok(result)
    }
}
