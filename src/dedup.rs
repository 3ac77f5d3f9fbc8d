//! Drop near-duplicate chunks via fuzzy string similarity.

pub const DEFAULT_THRESHOLD: f32 = 0.92;
const WINDOW: usize = 50;

/// Retain chunks in input order, dropping any candidate whose normalized
/// Levenshtein similarity against one of the **last 50 retained** chunks is
/// `>= threshold`. The sliding window bounds cost under the assumption that
/// duplicate content tends to be near-adjacent in paginated sources.
pub fn soft_dedup(chunks: Vec<String>, threshold: f32) -> Vec<String> {
    soft_dedup_keyed(chunks.into_iter().map(|c| (c, ())).collect(), threshold)
        .into_iter()
        .map(|(text, _)| text)
        .collect()
}

/// Convenience wrapper over [`soft_dedup`] using the documented default
/// threshold.
pub fn soft_dedup_default(chunks: Vec<String>) -> Vec<String> {
    soft_dedup(chunks, DEFAULT_THRESHOLD)
}

/// Same algorithm as [`soft_dedup`], but each chunk carries along arbitrary
/// metadata (e.g. a source page number) that must survive the filter
/// attached to its text.
pub fn soft_dedup_keyed<T>(chunks: Vec<(String, T)>, threshold: f32) -> Vec<(String, T)> {
    let mut retained: Vec<(String, T)> = Vec::with_capacity(chunks.len());

    for (candidate, meta) in chunks {
        let window_start = retained.len().saturating_sub(WINDOW);
        let is_duplicate = retained[window_start..]
            .iter()
            .any(|(kept, _)| similarity_ratio(kept, &candidate) >= threshold);

        if !is_duplicate {
            retained.push((candidate, meta));
        }
    }

    retained
}

/// Normalized Levenshtein similarity in `[0, 1]`: `1 - distance / max_len`.
/// Two empty strings are identical (`1.0`).
fn similarity_ratio(a: &str, b: &str) -> f32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max_len = a_chars.len().max(b_chars.len());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein_distance(&a_chars, &b_chars);
    1.0 - (distance as f32 / max_len as f32)
}

/// Classic O(n*m) edit-distance DP using a single rolling row.
fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_similarity_one() {
        assert_eq!(similarity_ratio("same text", "same text"), 1.0);
    }

    #[test]
    fn completely_different_strings_have_low_similarity() {
        let sim = similarity_ratio("abcdefgh", "12345678");
        assert!(sim < 0.2);
    }

    #[test]
    fn exact_duplicates_are_dropped() {
        let chunks = vec![
            "the mitochondrion is the powerhouse of the cell".to_string(),
            "the mitochondrion is the powerhouse of the cell".to_string(),
            "completely unrelated sentence about rust programming".to_string(),
        ];
        let result = soft_dedup_default(chunks);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn near_duplicates_above_threshold_are_dropped() {
        let chunks = vec![
            "the quick brown fox jumps over the lazy dog".to_string(),
            "the quick brown fox jumps over the lazy dog!".to_string(),
            "totally different content with no overlap whatsoever".to_string(),
        ];
        let result = soft_dedup(chunks, 0.9);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn window_only_compares_last_fifty_retained() {
        // A run of 51 distinct fillers pushes the original duplicate target
        // outside the 50-window, so a near-duplicate of chunk 0 that arrives
        // after the window has scrolled past it is retained.
        let mut chunks = vec!["unique chunk zero with distinctive content".to_string()];
        for i in 0..51 {
            chunks.push(format!("filler chunk number {} with unrelated text", i));
        }
        chunks.push("unique chunk zero with distinctive content".to_string());

        let result = soft_dedup_default(chunks);
        // The final duplicate of chunk 0 survives because it falls outside the window.
        let count_matching = result
            .iter()
            .filter(|c| c.as_str() == "unique chunk zero with distinctive content")
            .count();
        assert_eq!(count_matching, 2);
    }

    #[test]
    fn ten_repeats_collapse_to_one_within_window() {
        let mut chunks = vec!["repeated sentence appears here".to_string(); 10];
        chunks.push("a distinct trailing sentence".to_string());
        let result = soft_dedup_default(std::mem::take(&mut chunks));
        let count_matching = result
            .iter()
            .filter(|c| c.as_str() == "repeated sentence appears here")
            .count();
        assert_eq!(count_matching, 1);
    }
}
