//! Extractor registry for routing documents to content extractors.

use docrag_core::{ContentExtractor, ExtractError, ExtractedContent};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::{DocxExtractor, PdfExtractor, TextExtractor};

/// Declared types that carry no information about the payload.
const OPAQUE_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Registry of content extractors.
pub struct ExtractorRegistry {
    /// Named extractors
    extractors: HashMap<String, Arc<dyn ContentExtractor>>,
    /// MIME type to extractor name mapping
    mime_mapping: HashMap<String, String>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            mime_mapping: HashMap::new(),
        }
    }

    /// Registry with the text, PDF, and DOCX extractors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("text", TextExtractor::new());
        registry.register("pdf", PdfExtractor::new());
        registry.register("docx", DocxExtractor::new());
        registry
    }

    /// Register an extractor.
    pub fn register<E: ContentExtractor + 'static>(&mut self, name: &str, extractor: E) {
        let extractor = Arc::new(extractor);
        for mime in extractor.supported_types() {
            self.mime_mapping
                .insert((*mime).to_string(), name.to_string());
        }
        self.extractors.insert(name.to_string(), extractor);
    }

    /// Get an extractor for a MIME type.
    #[must_use]
    pub fn get_for_mime(&self, mime_type: &str) -> Option<Arc<dyn ContentExtractor>> {
        self.mime_mapping
            .get(mime_type)
            .and_then(|name| self.extractors.get(name))
            .cloned()
    }

    /// Work out the effective MIME type of a document.
    ///
    /// An explicit, informative type wins; otherwise the type is guessed
    /// from the filename. Parameters such as `; charset=utf-8` are dropped.
    #[must_use]
    pub fn resolve_mime(declared: Option<&str>, filename: Option<&str>) -> Option<String> {
        let declared = declared
            .and_then(|m| m.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty() && !OPAQUE_TYPES.contains(&m.as_str()));

        declared.or_else(|| {
            filename
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(str::to_string)
        })
    }

    /// Get an extractor that can handle a document.
    #[must_use]
    pub fn get_for(
        &self,
        mime_type: Option<&str>,
        filename: Option<&str>,
    ) -> Option<Arc<dyn ContentExtractor>> {
        if let Some(extractor) = mime_type.and_then(|m| self.get_for_mime(m)) {
            return Some(extractor);
        }

        let mime = mime_type.unwrap_or_default();
        self.extractors
            .values()
            .find(|extractor| extractor.can_extract(mime, filename))
            .cloned()
    }

    /// Extract text from document bytes.
    pub async fn extract_bytes(
        &self,
        data: &[u8],
        declared_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<ExtractedContent, ExtractError> {
        let mime = Self::resolve_mime(declared_type, filename);
        let extractor = self.get_for(mime.as_deref(), filename).ok_or_else(|| {
            ExtractError::UnsupportedType(
                mime.clone()
                    .or_else(|| filename.map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        })?;

        debug!(
            "Extracting {} bytes as {}",
            data.len(),
            mime.as_deref().unwrap_or("<by extension>")
        );
        extractor
            .extract_bytes(data, mime.as_deref().unwrap_or_default())
            .await
    }

    /// Read a file and extract its text.
    pub async fn extract_file(
        &self,
        path: &Path,
        declared_type: Option<&str>,
    ) -> Result<ExtractedContent, ExtractError> {
        let filename = path.file_name().and_then(|n| n.to_str());
        let data = tokio::fs::read(path).await?;
        self.extract_bytes(&data, declared_type, filename).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ExtractorRegistry::new();
        assert!(registry.extractors.is_empty());
        assert!(registry.mime_mapping.is_empty());
    }

    #[test]
    fn test_defaults_cover_text_pdf_docx() {
        let registry = ExtractorRegistry::default();
        assert_eq!(registry.extractors.len(), 3);
        assert!(registry.get_for_mime("text/plain").is_some());
        assert!(registry.get_for_mime("application/pdf").is_some());
        assert!(registry
            .get_for_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            )
            .is_some());
        assert!(registry.get_for_mime("image/png").is_none());
    }

    #[test]
    fn test_resolve_mime_prefers_declared() {
        assert_eq!(
            ExtractorRegistry::resolve_mime(Some("Text/Plain; charset=utf-8"), Some("x.pdf"))
                .as_deref(),
            Some("text/plain")
        );
    }

    #[test]
    fn test_resolve_mime_guesses_from_filename() {
        assert_eq!(
            ExtractorRegistry::resolve_mime(Some("application/octet-stream"), Some("report.pdf"))
                .as_deref(),
            Some("application/pdf")
        );
        assert_eq!(
            ExtractorRegistry::resolve_mime(None, Some("notes.txt")).as_deref(),
            Some("text/plain")
        );
        assert!(ExtractorRegistry::resolve_mime(None, None).is_none());
    }

    #[test]
    fn test_get_for_falls_back_to_extension() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.get_for(Some("application/x-unknown"), Some("a.md")).is_some());
        assert!(registry.get_for(None, Some("archive.tar")).is_none());
    }

    #[tokio::test]
    async fn test_extract_bytes_text() {
        let registry = ExtractorRegistry::with_defaults();
        let content = registry
            .extract_bytes(b"Hello, world!", None, Some("hello.txt"))
            .await
            .unwrap();
        assert_eq!(content.text, "Hello, world!");
    }

    #[tokio::test]
    async fn test_extract_unsupported_type() {
        let registry = ExtractorRegistry::with_defaults();
        let err = registry
            .extract_bytes(&[0u8; 10], Some("image/png"), Some("photo.png"))
            .await
            .unwrap_err();

        match err {
            ExtractError::UnsupportedType(mime) => assert_eq!(mime, "image/png"),
            other => panic!("Expected UnsupportedType error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_without_any_type_hint() {
        let registry = ExtractorRegistry::with_defaults();
        let err = registry.extract_bytes(b"data", None, None).await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(ref t) if t == "unknown"));
    }

    #[tokio::test]
    async fn test_extract_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, "From disk").unwrap();

        let content = ExtractorRegistry::with_defaults()
            .extract_file(&file_path, None)
            .await
            .unwrap();
        assert_eq!(content.text, "From disk");
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_io_error() {
        let temp_dir = tempdir().unwrap();
        let err = ExtractorRegistry::with_defaults()
            .extract_file(&temp_dir.path().join("missing.txt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
