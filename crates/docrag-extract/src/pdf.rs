//! PDF content extractor.
//!
//! Uses pdf-extract for text and lopdf for document metadata. Both parsers
//! are synchronous and can be slow on large files, so they run on the
//! blocking pool.

use async_trait::async_trait;
use docrag_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use lopdf::{Document, Object};
use tracing::{debug, warn};

use crate::text::has_extension;

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn supported_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn can_extract_by_extension(&self, filename: &str) -> bool {
        has_extension(filename, &["pdf"])
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedContent, ExtractError> {
        debug!("Extracting PDF ({} bytes)", data.len());
        let bytes = data.to_vec();

        // A panic inside the parser surfaces here as a join error.
        let (text, metadata) = tokio::task::spawn_blocking(move || {
            let text = pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractError::Failed(format!("PDF extraction failed: {e}")))?;
            Ok::<_, ExtractError>((text, read_metadata(&bytes)))
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("PDF parser aborted: {e}")))??;

        debug!(
            "Extracted {} chars from {:?} pages",
            text.len(),
            metadata.page_count
        );

        Ok(ExtractedContent { text, metadata })
    }
}

/// Page count and Info dictionary fields. Missing pieces are left empty.
fn read_metadata(bytes: &[u8]) -> ContentMetadataInfo {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to load PDF for metadata: {}", e);
            return ContentMetadataInfo::default();
        }
    };

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        });
    let text_field = |key: &[u8]| {
        info.and_then(|dict| dict.get(key).ok())
            .and_then(|obj| obj.as_str().ok())
            .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
            .filter(|s| !s.is_empty())
    };

    ContentMetadataInfo {
        title: text_field(b"Title"),
        author: text_field(b"Author"),
        page_count: u32::try_from(doc.get_pages().len()).ok(),
    }
}
