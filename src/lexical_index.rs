//! In-memory BM25 over tokenized chunk texts, positionally aligned with the
//! vector index (row `i` of each refers to the same chunk).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

const K1: f32 = 1.5;
const B: f32 = 0.75;

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `\w` is Unicode-aware under the `regex` crate's default mode, so
    // accented letters in multilingual content tokenize to themselves
    // rather than being dropped by an ASCII-only character class.
    RE.get_or_init(|| Regex::new(r"[\w\-]+").unwrap())
}

/// Tokenize text into lowercased terms matching `[\w\-]+` under Unicode
/// word-character semantics. The same function must be used for indexing
/// and querying.
pub fn tokenize(text: &str) -> Vec<String> {
    token_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

pub struct LexicalIndex {
    n: usize,
    doc_lengths: Vec<usize>,
    avg_doc_length: f32,
    postings: HashMap<String, Vec<(usize, usize)>>, // term -> [(row, term_freq)]
}

impl LexicalIndex {
    pub fn empty() -> Self {
        Self {
            n: 0,
            doc_lengths: Vec::new(),
            avg_doc_length: 0.0,
            postings: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn len(&self) -> usize {
        self.n
    }

    /// Build the corpus index. `texts[i]` is row `i`; callers must supply
    /// rows in the same order used to build the vector index.
    pub fn build(texts: &[String]) -> Self {
        if texts.is_empty() {
            return Self::empty();
        }

        let mut postings: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(texts.len());

        for (row, text) in texts.iter().enumerate() {
            let tokens = tokenize(text);
            doc_lengths.push(tokens.len());

            let mut term_freqs: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *term_freqs.entry(token).or_insert(0) += 1;
            }
            for (term, freq) in term_freqs {
                postings.entry(term).or_default().push((row, freq));
            }
        }

        let total_length: usize = doc_lengths.iter().sum();
        let avg_doc_length = total_length as f32 / texts.len() as f32;

        Self {
            n: texts.len(),
            doc_lengths,
            avg_doc_length,
            postings,
        }
    }

    /// Score the query against every row containing at least one query
    /// term, using Okapi BM25 (`k1=1.5`, `b=0.75`), and return the top `k`
    /// rows descending by score. Empty corpus returns empty results.
    pub fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut query_terms: Vec<String> = tokenize(query);
        query_terms.sort();
        query_terms.dedup();
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<usize, f32> = HashMap::new();

        for term in &query_terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = ((self.n as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();

            for &(row, tf) in postings {
                let tf = tf as f32;
                let doc_len = self.doc_lengths[row] as f32;
                let denom = tf + K1 * (1.0 - B + B * doc_len / self.avg_doc_length.max(1e-9));
                let score = idf * (tf * (K1 + 1.0)) / denom.max(1e-9);
                *scores.entry(row).or_insert(0.0) += score;
            }
        }

        let mut scored: Vec<(usize, f32)> = scores.into_iter().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_lowercases_and_strips_punctuation() {
        let tokens = tokenize("XJ-9 error: Overvoltage!");
        assert_eq!(tokens, vec!["xj-9", "error", "overvoltage"]);
    }

    #[test]
    fn empty_corpus_returns_empty_results() {
        let index = LexicalIndex::build(&[]);
        assert!(index.search("anything", 5).is_empty());
    }

    #[test]
    fn exact_term_match_ranks_first() {
        let texts = vec![
            "XJ-9 error code means overvoltage".to_string(),
            "completely unrelated content about gardening".to_string(),
            "another unrelated passage about weather".to_string(),
        ];
        let index = LexicalIndex::build(&texts);
        let results = index.search("XJ-9", 3);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn query_with_no_matching_terms_returns_empty() {
        let texts = vec!["apples and oranges".to_string()];
        let index = LexicalIndex::build(&texts);
        assert!(index.search("zzz nonexistent", 5).is_empty());
    }

    #[test]
    fn unicode_word_characters_are_preserved() {
        let tokens = tokenize("Café résumé naïve");
        assert_eq!(tokens, vec!["café", "résumé", "naïve"]);
    }

    #[test]
    fn same_tokenizer_used_for_index_and_query() {
        let texts = vec!["Café résumé naïve".to_string()];
        let index = LexicalIndex::build(&texts);
        let results = index.search("café", 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].1 > 0.0);
    }
}
