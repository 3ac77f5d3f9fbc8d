//! Formats ranked hits into a numbered, citation-bearing context string
//! honoring a character budget. Ordering and numbering are the citation
//! contract exposed to the generator.

use crate::types::Hit;

pub const DEFAULT_MAX_CHARS: usize = 14000;

pub fn assemble(hits: &[Hit], max_chars: usize) -> String {
    let mut out = String::new();

    for (i, hit) in hits.iter().enumerate() {
        let mut header = format!("[{}] doc={} chunk={}", i, hit.original_name, hit.chunk_index);
        if let (Some(start), Some(end)) = (hit.page_start, hit.page_end) {
            header.push_str(&format!(" pages={}-{}", start, end));
        }
        out.push_str(&header);
        out.push('\n');
        out.push_str(&hit.text);
        out.push_str("\n\n");
    }

    truncate_chars(&out, max_chars)
}

pub fn assemble_default(hits: &[Hit]) -> String {
    assemble(hits, DEFAULT_MAX_CHARS)
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
    use uuid::Uuid;

    fn hit(name: &str, index: i64, pages: Option<(i64, i64)>, text: &str) -> Hit {
        Hit {
            chunk_id: Uuid::new_v4(),
            doc_id: Uuid::new_v4(),
            original_name: name.to_string(),
            stored_name: format!("stored-{}", name),
            chunk_index: index,
            page_start: pages.map(|p| p.0),
            page_end: pages.map(|p| p.1),
            section: None,
            score: 1.0,
            vec_score: 1.0,
            bm25_score: 1.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn header_includes_pages_when_present() {
        let hits = vec![hit("bio.pdf", 2, Some((2, 2)), "the mitochondrion is the powerhouse of the cell")];
        let out = assemble_default(&hits);
        assert!(out.starts_with("[0] doc=bio.pdf chunk=2 pages=2-2\n"));
    }

    #[test]
    fn header_omits_pages_when_absent() {
        let hits = vec![hit("notes.md", 0, None, "some notes")];
        let out = assemble_default(&hits);
        assert!(out.starts_with("[0] doc=notes.md chunk=0\n"));
    }

    #[test]
    fn multiple_hits_are_numbered_and_separated() {
        let hits = vec![
            hit("a.txt", 0, None, "first"),
            hit("b.txt", 1, None, "second"),
        ];
        let out = assemble_default(&hits);
        assert!(out.contains("[0] doc=a.txt chunk=0\nfirst\n\n"));
        assert!(out.contains("[1] doc=b.txt chunk=1\nsecond\n\n"));
    }

    #[test]
    fn result_truncated_to_max_chars() {
        let hits = vec![hit("a.txt", 0, None, &"x".repeat(100))];
        let out = assemble(&hits, 20);
        assert_eq!(out.chars().count(), 20);
    }

    #[test]
    fn empty_hits_yields_empty_string() {
        assert_eq!(assemble_default(&[]), "");
    }
}
