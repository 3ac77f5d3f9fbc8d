//! Unicode/whitespace canonicalization and sentence splitting.
//!
//! Both operations are pure and total: `normalize` never fails, and
//! `split_sentences` always returns a (possibly empty) vector.

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").unwrap())
}

/// Replace non-breaking spaces with ordinary spaces, collapse any run of
/// whitespace to a single space, and trim leading/trailing whitespace.
pub fn normalize(s: &str) -> String {
    let replaced = s.replace('\u{00A0}', " ");
    let collapsed = whitespace_run().replace_all(&replaced, " ");
    collapsed.trim().to_string()
}

/// Normalize, then split on a sentence terminator (`. ! ?`) followed by
/// whitespace. Empty segments are discarded.
pub fn split_sentences(s: &str) -> Vec<String> {
    let normalized = normalize(s);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0usize;
    for m in sentence_boundary().find_iter(&normalized) {
        let end_of_sentence = m.start() + 1; // include the terminator, drop the trailing whitespace
        let candidate = normalized[start..end_of_sentence].trim();
        if !candidate.is_empty() {
            sentences.push(candidate.to_string());
        }
        start = m.end();
    }
    let tail = normalized[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}
