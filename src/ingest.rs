//! Extracts raw bytes into text. Scoped to the three formats the
//! second-brain accepts: PDF, Markdown, and plain text. Parsing libraries
//! are depended on, not designed here.

use crate::error::{Result, SecondBrainError};

/// Extract plain text from an upload's raw bytes, dispatching on
/// extension. Any failure is a parser failure: the ingestion of that
/// document fails and no partial chunks are written.
pub fn extract_text(original_name: &str, bytes: &[u8]) -> Result<String> {
    let extension = original_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| SecondBrainError::Parser(format!("failed to extract PDF text: {}", e))),
        _ => std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|e| SecondBrainError::Parser(format!("not valid UTF-8 text: {}", e))),
    }
}

/// Extract text per source page, when the format has a notion of pages.
/// `pdf_extract` separates pages with a form-feed (`U+000C`) in its plain
/// text output; non-paginated formats are returned as a single page.
pub fn extract_pages(original_name: &str, bytes: &[u8]) -> Result<Vec<String>> {
    let text = extract_text(original_name, bytes)?;
    let extension = original_name.rsplit('.').next().unwrap_or("").to_lowercase();

    if extension == "pdf" {
        Ok(text.split('\u{c}').map(|s| s.to_string()).collect())
    } else {
        Ok(vec![text])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_round_trips() {
        let bytes = b"hello world";
        let text = extract_text("notes.txt", bytes).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn markdown_treated_as_plain_text() {
        let bytes = b"# heading\nbody";
        let text = extract_text("notes.md", bytes).unwrap();
        assert_eq!(text, "# heading\nbody");
    }

    #[test]
    fn invalid_utf8_is_a_parser_failure() {
        let bytes = [0xff, 0xfe, 0x00];
        assert!(extract_text("notes.txt", &bytes).is_err());
    }

    #[test]
    fn non_pdf_extract_pages_is_a_single_page() {
        let pages = extract_pages("notes.md", b"one page only").unwrap();
        assert_eq!(pages, vec!["one page only".to_string()]);
    }
}
