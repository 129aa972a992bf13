//! Byte-preserving duplication of a keyed object inside raw JSON text.
//!
//! Locale files are edited by the admin translation editor as well as by this
//! tool, so duplication works on the text itself: the entry for `key` is located
//! by brace matching, copied under `prefixed_key`, and inserted right after the
//! original. Every byte outside the inserted copy is left as it was.

use tracing::debug;

use crate::error::{Result, SectionError};
use crate::namespace::swap_convention;
use crate::scan::{self, Token, TokenKind};

/// Marker put in front of duplicated display names until someone translates them.
pub const PENDING_MARKER: &str = "# ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceOutcome {
    /// Key actually matched in the text (after any convention fallback).
    pub key: String,
    pub prefixed_key: String,
    /// Number of copies inserted.
    pub inserted: usize,
    /// Occurrences skipped because the prefixed sibling already existed.
    pub already_present: usize,
}

impl SpliceOutcome {
    pub fn changed(&self) -> bool {
        self.inserted > 0
    }
}

/// Byte span of one `"key": { ... }` entry, leading whitespace included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySpan {
    pub start: usize,
    pub end: usize,
}

/// Duplicate every object-valued `key` entry in `text` under `prefixed_key`.
///
/// The naming convention is decided on the entries of the root `sections`
/// object (the whole document when there is none): `key` is used when it is
/// there, otherwise the other convention once. Returns `SourceNotFound` when
/// neither is there and `AmbiguousConvention` when both are.
pub fn duplicate_entry(text: &str, key: &str, prefixed_key: &str) -> Result<(String, SpliceOutcome)> {
    let tokens = scan::tokenize(text)?;
    let found = is_section_key(text, &tokens, key);
    let alt_key = swap_convention(key);
    let alt_found = alt_key != key && is_section_key(text, &tokens, &alt_key);

    let (key, prefixed_key) = match (found, alt_found) {
        (true, true) => {
            return Err(SectionError::AmbiguousConvention { key: key.to_string(), alternate: alt_key });
        }
        (true, false) => (key.to_string(), prefixed_key.to_string()),
        (false, true) => {
            debug!(from = key, to = %alt_key, "falling back to alternate key convention");
            (alt_key, swap_convention(prefixed_key))
        }
        (false, false) => return Err(SectionError::SourceNotFound(format!("key `{key}`"))),
    };

    let mut out = text.to_string();
    let mut outcome = SpliceOutcome { key: key.clone(), prefixed_key: prefixed_key.clone(), ..Default::default() };
    let mut from = 0usize;

    loop {
        let tokens = scan::tokenize(&out)?;
        let Some(&key_idx) = key_occurrences(&out, &tokens, &key, from).first() else {
            break;
        };
        let key_tok = tokens[key_idx];

        let parent_open = scan::enclosing_open_brace(&tokens, key_idx)
            .ok_or_else(|| SectionError::malformed(format!("no enclosing object for `{key}`")))?;
        let parent_close = scan::matching_close_brace(&tokens, parent_open)
            .ok_or_else(|| SectionError::malformed(format!("unbalanced object around `{key}`")))?;

        if has_sibling_key(&out, &tokens, key_tok.depth, parent_open, parent_close, &prefixed_key) {
            debug!(key = %key, prefixed = %prefixed_key, at = key_tok.start, "prefixed entry already present");
            outcome.already_present += 1;
            from = key_tok.end;
            continue;
        }

        let span = entry_span(&out, &tokens, key_idx)?;
        let copy = rewrite_entry(&out[span.start..span.end], &prefixed_key)?;
        let mut spliced = String::with_capacity(out.len() + copy.len() + 1);
        spliced.push_str(&out[..span.end]);
        spliced.push(',');
        spliced.push_str(&copy);
        spliced.push_str(&out[span.end..]);
        debug!(key = %key, prefixed = %prefixed_key, at = span.start, len = copy.len(), "spliced duplicate entry");

        from = span.end + 1 + copy.len();
        out = spliced;
        outcome.inserted += 1;
    }

    Ok((out, outcome))
}

/// Locate the entry for the key token at `key_idx`: from just after the previous
/// non-whitespace character through the value object's closing brace.
pub fn entry_span(text: &str, tokens: &[Token], key_idx: usize) -> Result<EntrySpan> {
    let key_tok = tokens[key_idx];
    let value_idx = scan::value_of(tokens, key_idx)
        .ok_or_else(|| SectionError::malformed(format!("key at byte {} has no value", key_tok.start)))?;
    let value_close = scan::matching_close_brace(tokens, value_idx)
        .ok_or_else(|| SectionError::malformed(format!("unbalanced value for key at byte {}", key_tok.start)))?;
    let start = text[..key_tok.start].trim_end().len();
    Ok(EntrySpan { start, end: tokens[value_close].end })
}

/// Key tokens named `key` (with an object value) starting at or after byte `from`.
fn key_occurrences(text: &str, tokens: &[Token], key: &str, from: usize) -> Vec<usize> {
    (0..tokens.len())
        .filter(|&i| tokens[i].start >= from && scan::is_key(tokens, i) && tokens[i].inner(text) == key)
        .filter(|&i| scan::value_of(tokens, i).is_some_and(|v| tokens[v].kind == TokenKind::OpenBrace))
        .collect()
}

/// Token range and child depth of the root-level `sections` object.
fn sections_object(text: &str, tokens: &[Token]) -> Option<(usize, usize, usize)> {
    let key_idx = (0..tokens.len())
        .find(|&i| tokens[i].depth == 1 && scan::is_key(tokens, i) && tokens[i].inner(text) == "sections")?;
    let open = scan::value_of(tokens, key_idx).filter(|&v| tokens[v].kind == TokenKind::OpenBrace)?;
    let close = scan::matching_close_brace(tokens, open)?;
    Some((open, close, tokens[open].depth + 1))
}

/// Object-valued `key` directly under `sections`, or anywhere when the
/// document has no `sections` object.
fn is_section_key(text: &str, tokens: &[Token], key: &str) -> bool {
    let occurrences = key_occurrences(text, tokens, key, 0);
    match sections_object(text, tokens) {
        Some((open, close, depth)) => occurrences.iter().any(|&i| i > open && i < close && tokens[i].depth == depth),
        None => !occurrences.is_empty(),
    }
}

fn has_sibling_key(text: &str, tokens: &[Token], depth: usize, open: usize, close: usize, name: &str) -> bool {
    (open + 1..close).any(|i| tokens[i].depth == depth && scan::is_key(tokens, i) && tokens[i].inner(text) == name)
}

/// Copy of an entry with its key renamed and its display names marked pending.
fn rewrite_entry(entry: &str, prefixed_key: &str) -> Result<String> {
    let tokens = scan::tokenize(entry)?;
    let key_idx = tokens
        .iter()
        .position(|t| t.kind == TokenKind::Str)
        .ok_or_else(|| SectionError::malformed("entry without key"))?;
    let value_idx =
        scan::value_of(&tokens, key_idx).ok_or_else(|| SectionError::malformed("entry without value"))?;
    let value_depth = tokens[value_idx].depth;

    // (byte offset, text to insert or replacement range)
    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    let key_tok = tokens[key_idx];
    edits.push((key_tok.start, key_tok.end, serde_json::to_string(prefixed_key)?));

    for i in value_idx + 1..tokens.len() {
        let t = tokens[i];
        if t.depth != value_depth + 1 || !scan::is_key(&tokens, i) {
            continue;
        }
        match t.inner(entry) {
            "name" => {
                if let Some(pos) = string_value_insert_point(&tokens, i) {
                    edits.push((pos, pos, PENDING_MARKER.to_string()));
                }
            }
            "presets" => {
                let Some(open) = scan::value_of(&tokens, i).filter(|&v| tokens[v].kind == TokenKind::OpenBrace)
                else {
                    continue;
                };
                let close = scan::matching_close_brace(&tokens, open)
                    .ok_or_else(|| SectionError::malformed("unbalanced presets object"))?;
                for j in open + 1..close {
                    if tokens[j].depth == value_depth + 2
                        && scan::is_key(&tokens, j)
                        && tokens[j].inner(entry) == "name"
                        && let Some(pos) = string_value_insert_point(&tokens, j)
                    {
                        edits.push((pos, pos, PENDING_MARKER.to_string()));
                    }
                }
            }
            _ => {}
        }
    }

    edits.sort_by_key(|e| std::cmp::Reverse(e.0));
    let mut out = entry.to_string();
    for (start, end, insert) in edits {
        out.replace_range(start..end, &insert);
    }
    Ok(out)
}

/// Byte offset just inside the opening quote of a string value.
fn string_value_insert_point(tokens: &[Token], key_idx: usize) -> Option<usize> {
    let v = scan::value_of(tokens, key_idx)?;
    (tokens[v].kind == TokenKind::Str).then_some(tokens[v].start + 1)
}
