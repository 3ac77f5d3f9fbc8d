//! Sentence-pack into overlapping bounded chunks.

use crate::normalize::split_sentences;

pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const DEFAULT_OVERLAP: usize = 120;
pub const DEFAULT_HARD_LIMIT: usize = 1400;

/// Pack sentences into a rolling buffer, emitting a chunk each time adding
/// the next sentence would exceed `chunk_size` characters (counting a
/// one-char joiner between sentences). Each emitted chunk is truncated to
/// `hard_limit` characters; the tail of the buffer — whole sentences,
/// selected right-to-left up to `overlap` characters — seeds the next
/// chunk. The final non-empty buffer is always emitted.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize, hard_limit: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut buffer: Vec<String> = Vec::new();
    let mut buffer_len = 0usize;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();
        let proposed_len = if buffer.is_empty() {
            sentence_len
        } else {
            buffer_len + 1 + sentence_len
        };

        if !buffer.is_empty() && proposed_len > chunk_size {
            chunks.push(emit(&buffer, hard_limit));

            buffer = select_overlap(&buffer, overlap);
            buffer_len = joined_len(&buffer);

            buffer_len = if buffer.is_empty() {
                sentence_len
            } else {
                buffer_len + 1 + sentence_len
            };
            buffer.push(sentence);
        } else {
            buffer.push(sentence);
            buffer_len = proposed_len;
        }
    }

    if !buffer.is_empty() {
        chunks.push(emit(&buffer, hard_limit));
    }

    chunks
}

/// Convenience wrapper over [`chunk`] using the documented defaults.
pub fn chunk_default(text: &str) -> Vec<String> {
    chunk(text, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP, DEFAULT_HARD_LIMIT)
}

fn emit(buffer: &[String], hard_limit: usize) -> String {
    truncate_chars(&buffer.join(" "), hard_limit)
}

fn joined_len(buffer: &[String]) -> usize {
    if buffer.is_empty() {
        return 0;
    }
    let sentences_len: usize = buffer.iter().map(|s| s.chars().count()).sum();
    sentences_len + (buffer.len() - 1)
}

/// Select the suffix of `buffer`, whole sentences only, scanned
/// right-to-left, whose joined length does not exceed `overlap`
/// characters. Order is preserved.
fn select_overlap(buffer: &[String], overlap: usize) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    let mut total = 0usize;

    for sentence in buffer.iter().rev() {
        let len = sentence.chars().count();
        let additional = if selected.is_empty() { len } else { len + 1 };
        if total + additional > overlap {
            break;
        }
        total += additional;
        selected.push(sentence.clone());
    }

    selected.reverse();
    selected
}

fn truncate_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        s.chars().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_short_sentence_is_one_chunk() {
        let chunks = chunk("Just one sentence.", 900, 120, 1400);
        assert_eq!(chunks, vec!["Just one sentence."]);
    }

    #[test]
    fn every_chunk_respects_hard_limit() {
        let long_sentence = format!("{}.", "word ".repeat(2000).trim());
        let chunks = chunk(&long_sentence, 900, 120, 1400);
        for c in &chunks {
            assert!(c.chars().count() <= 1400);
        }
    }

    #[test]
    fn oversized_single_sentence_truncated_to_hard_limit() {
        let long_sentence = format!("{}.", "x".repeat(5000));
        let chunks = chunk(&long_sentence, 900, 120, 1400);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 1400);
    }

    #[test]
    fn consecutive_chunks_share_sentence_overlap() {
        let sentences: Vec<String> = (0..30)
            .map(|i| format!("Sentence number {} has some body text to pad it out.", i))
            .collect();
        let text = sentences.join(" ");
        let chunks = chunk(&text, 200, 80, 400);
        assert!(chunks.len() >= 2);

        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let prev_sentences = split_sentences(prev);
            let next_sentences = split_sentences(next);
            let shares_a_sentence = prev_sentences
                .iter()
                .any(|s| next_sentences.first().map(|n| n == s).unwrap_or(false));
            assert!(
                shares_a_sentence,
                "expected a shared boundary sentence between chunks:\n{}\n---\n{}",
                prev, next
            );
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk("   ", 900, 120, 1400).is_empty());
    }

    #[test]
    fn zero_overlap_does_not_repeat_sentences() {
        let sentences: Vec<String> = (0..10)
            .map(|i| format!("Sentence {} padded with extra words to force a split.", i))
            .collect();
        let text = sentences.join(" ");
        let chunks = chunk(&text, 100, 0, 300);
        assert!(chunks.len() >= 2);
        // No chunk after the first should start with the previous chunk's last sentence.
        for pair in chunks.windows(2) {
            let prev_last = split_sentences(&pair[0]).last().cloned().unwrap();
            let next_first = split_sentences(&pair[1]).first().cloned().unwrap();
            assert_ne!(prev_last, next_first);
        }
    }
}
