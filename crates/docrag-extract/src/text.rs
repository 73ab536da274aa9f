//! Plain text extractor.

use async_trait::async_trait;
use docrag_core::{ContentExtractor, ExtractError, ExtractedContent};
use tracing::debug;

/// Extractor for UTF-8 text documents.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for TextExtractor {
    fn supported_types(&self) -> &[&str] {
        &["text/plain", "text/markdown", "text/x-markdown"]
    }

    fn can_extract_by_extension(&self, filename: &str) -> bool {
        has_extension(filename, &["txt", "text", "md", "markdown"])
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedContent, ExtractError> {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        let text = std::str::from_utf8(data)
            .map_err(|e| ExtractError::Parse(format!("text is not valid UTF-8: {e}")))?;

        debug!("Extracted {} bytes of plain text", text.len());
        Ok(ExtractedContent::from_text(text))
    }
}

/// Case-insensitive extension check on a bare filename.
pub(crate) fn has_extension(filename: &str, extensions: &[&str]) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types_includes_plain_text() {
        let extractor = TextExtractor::new();
        assert!(extractor.supported_types().contains(&"text/plain"));
        assert!(extractor.supported_types().contains(&"text/markdown"));
    }

    #[test]
    fn test_can_extract_by_extension() {
        let extractor = TextExtractor::default();
        assert!(extractor.can_extract_by_extension("notes.txt"));
        assert!(extractor.can_extract_by_extension("README.MD"));
        assert!(!extractor.can_extract_by_extension("report.pdf"));
        assert!(!extractor.can_extract_by_extension("Makefile"));
    }

    #[test]
    fn test_can_extract_by_mime_or_name() {
        let extractor = TextExtractor::new();
        assert!(extractor.can_extract("text/plain", None));
        assert!(extractor.can_extract("application/octet-stream", Some("a.txt")));
        assert!(!extractor.can_extract("application/octet-stream", Some("a.bin")));
    }

    #[tokio::test]
    async fn test_extract_simple_text() {
        let content = TextExtractor::new()
            .extract_bytes(b"Hello, world!\nSecond line.", "text/plain")
            .await
            .unwrap();
        assert_eq!(content.text, "Hello, world!\nSecond line.");
    }

    #[tokio::test]
    async fn test_extract_strips_bom() {
        let content = TextExtractor::new()
            .extract_bytes(b"\xEF\xBB\xBFhello", "text/plain")
            .await
            .unwrap();
        assert_eq!(content.text, "hello");
    }

    #[tokio::test]
    async fn test_extract_handles_unicode() {
        let text = "Hello 世界! Привет мир!";
        let content = TextExtractor::new()
            .extract_bytes(text.as_bytes(), "text/plain")
            .await
            .unwrap();
        assert_eq!(content.text, text);
    }

    #[tokio::test]
    async fn test_extract_empty() {
        let content = TextExtractor::new()
            .extract_bytes(b"", "text/plain")
            .await
            .unwrap();
        assert!(content.text.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_parse_error() {
        let err = TextExtractor::new()
            .extract_bytes(&[0xff, 0xfe, 0x00, 0x41], "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }
}
