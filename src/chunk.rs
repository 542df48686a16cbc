//! Hierarchical text chunker with trailing overlap.
//!
//! Splits normalized units into segments bounded by `chunk_size`
//! characters, preferring the coarsest separator that fits: paragraph
//! (`\n\n`), then line (`\n`), then word (` `), then a hard character
//! split. Each chunk after the first repeats the trailing
//! `chunk_overlap` characters of its predecessor so no boundary is lost
//! entirely to a split; a produced chunk is therefore never longer than
//! `chunk_size + chunk_overlap` characters.
//!
//! Chunking is fully deterministic: identical input and parameters yield
//! an identical chunk sequence.

use sha2::{Digest, Sha256};

use crate::models::{Chunk, NormalizedUnit};

/// Separator hierarchy, coarsest first. The empty-string fallback (a
/// character-level split) is implicit.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Chunk a sequence of normalized units.
///
/// A unit shorter than `chunk_size` yields exactly one chunk; an empty
/// unit yields none.
pub fn chunk_units(units: &[NormalizedUnit], chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for unit in units {
        for text in split_unit(&unit.text, chunk_size, chunk_overlap) {
            chunks.push(make_chunk(&text, &unit.source));
        }
    }
    chunks
}

/// Split one unit's text into chunk texts, applying the overlap policy.
fn split_unit(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let segments = split_recursive(text, chunk_size, &SEPARATORS);

    // Each segment after the first is prefixed with the trailing overlap
    // of the chunk before it, verbatim.
    let mut out: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        let tail = match out.last() {
            Some(prev) if chunk_overlap > 0 => char_tail(prev, chunk_overlap).to_string(),
            _ => String::new(),
        };
        if tail.is_empty() {
            out.push(segment);
        } else {
            out.push(format!("{}{}", tail, segment));
        }
    }
    out
}

/// Recursively split `text` into segments of at most `target` characters,
/// using the coarsest separator in `seps` that produces a split and
/// greedily packing adjacent pieces back together while they fit.
fn split_recursive(text: &str, target: usize, seps: &[&str]) -> Vec<String> {
    if char_len(text) <= target {
        return vec![text.to_string()];
    }

    let Some((sep, rest)) = seps.split_first() else {
        return hard_split(text, target);
    };

    let parts: Vec<&str> = text.split(sep).collect();
    if parts.len() == 1 {
        return split_recursive(text, target, rest);
    }

    let sep_len = char_len(sep);
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for part in parts {
        let part_len = char_len(part);

        // A piece that alone exceeds the target cannot be packed; it is
        // split again at the next-finer separator.
        if part_len > target {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            out.extend(split_recursive(part, target, rest));
            continue;
        }

        let would_be = if buf.is_empty() {
            part_len
        } else {
            buf_len + sep_len + part_len
        };
        if would_be > target && !buf.is_empty() {
            out.push(std::mem::take(&mut buf));
            buf_len = 0;
        }
        if !buf.is_empty() {
            buf.push_str(sep);
            buf_len += sep_len;
        }
        buf.push_str(part);
        buf_len += part_len;
    }
    if !buf.is_empty() {
        out.push(buf);
    }

    out.retain(|s| !s.trim().is_empty());
    out
}

/// Last-resort split at fixed character offsets.
fn hard_split(text: &str, target: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(target.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The trailing `n` characters of `s` (all of `s` if shorter).
fn char_tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

fn make_chunk(text: &str, source: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        text: text.to_string(),
        source: source.to_string(),
        hash,
    }
}
