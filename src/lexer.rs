//! # Lexical Analysis
//!
//! The score language is line-oriented: most constructs (`bpm 128`, `pat A = ...`,
//! `channel 1 => ...`) occupy one physical line. This module turns raw source text
//! into a sequence of [`LogicalLine`]s with comments stripped and triple-quoted
//! `song` fields folded back into a single multi-line unit, plus a shared
//! bracket-aware word splitter ([`split_tokens`]) used by the parser for every
//! right-hand side (pattern bodies, sequence bodies, channel specs, effect lists).
//!
//! Comments are `#` or `//` to end of line, except inside quotes, `[...]`, or
//! `(...)` (§4.1). This module is the one place that rule is implemented; callers
//! receive already-stripped text.

/// One statement's worth of source text, with its starting line/column for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub line: usize,
    pub column: usize,
    pub text: String,
}

/// Strip a `#`/`//` trailing comment from a single physical line, honoring quotes
/// and bracket nesting.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_quote: Option<char> = None;
    let mut paren_depth = 0i32;
    let mut bracket_depth = 0i32;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                }
                i += 1;
                continue;
            }
            None => {}
        }
        match c {
            '"' | '\'' => in_quote = Some(c),
            '(' => paren_depth += 1,
            ')' => paren_depth = (paren_depth - 1).max(0),
            '[' => bracket_depth += 1,
            ']' => bracket_depth = (bracket_depth - 1).max(0),
            '#' if paren_depth == 0 && bracket_depth == 0 => return &line[..i],
            '/' if paren_depth == 0
                && bracket_depth == 0
                && bytes.get(i + 1) == Some(&b'/') =>
            {
                return &line[..i]
            }
            _ => {}
        }
        i += 1;
    }
    line
}

/// Tokenize source text into logical lines, stripping comments and folding
/// `"""..."""` multi-line values into the line that opened them.
pub fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut lines = source.lines().enumerate().peekable();
    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let stripped = strip_comment(raw);
        if stripped.trim().is_empty() {
            continue;
        }

        if stripped.matches("\"\"\"").count() % 2 == 1 {
            // Opens a triple-quoted block: accumulate until the closing `"""`.
            let mut text = stripped.to_string();
            let mut closed = false;
            while let Some((_, more)) = lines.next() {
                text.push('\n');
                text.push_str(more);
                if more.contains("\"\"\"") {
                    closed = true;
                    break;
                }
            }
            let _ = closed; // unterminated blocks are reported by the parser
            out.push(LogicalLine {
                line: line_no,
                column: leading_column(raw),
                text,
            });
            continue;
        }

        out.push(LogicalLine {
            line: line_no,
            column: leading_column(raw),
            text: stripped.to_string(),
        });
    }
    out
}

fn leading_column(raw: &str) -> usize {
    raw.len() - raw.trim_start().len() + 1
}

/// Split a right-hand side into raw tokens, treating `(...)`, `[...]`, `<...>`,
/// and quoted regions as atomic (no internal whitespace split), so that
/// `(C4 E4 G4)*2` and `C4<pan:-1.0,vib:4>` each come back as a single token.
pub fn split_tokens(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;

    for c in s.chars() {
        if let Some(q) = in_quote {
            current.push(c);
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '<' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '>' => {
                depth = (depth - 1).max(0);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Split a string on top-level commas, respecting nested `(...)`/`[...]` so that
/// `inst(temp, 2)`'s argument list or an effect's param list doesn't get cut on an
/// inner comma.
pub fn split_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = (depth - 1).max(0);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Split a string on top-level colons, respecting nested `(...)`/`[...]`, for
/// modifier chains like `rev:oct(-1):inst(lead)`.
pub fn split_colons(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = (depth - 1).max(0);
                current.push(c);
            }
            ':' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Split on the first top-level occurrence of `sep` (outside quotes/brackets),
/// e.g. splitting `pat A = C4 D4` on `=` into `("pat A", "C4 D4")`.
pub fn split_once_top_level(s: &str, sep: char) -> Option<(String, String)> {
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = (depth - 1).max(0),
            c if c == sep && depth == 0 => {
                return Some((s[..i].trim().to_string(), s[i + c.len_utf8()..].trim().to_string()));
            }
            _ => {}
        }
    }
    None
}
