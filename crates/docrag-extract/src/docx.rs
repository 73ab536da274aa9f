//! DOCX content extractor.
//!
//! A `.docx` file is a zip archive; the body text lives in
//! `word/document.xml` as `<w:t>` runs grouped into `<w:p>` paragraphs.
//! Paragraphs become lines, `<w:tab/>` becomes a tab and `<w:br/>` a line
//! break. Everything else (styles, numbering, headers) is ignored.

use async_trait::async_trait;
use docrag_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

use crate::text::has_extension;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Extractor for Word `.docx` documents.
pub struct DocxExtractor;

impl DocxExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for DocxExtractor {
    fn supported_types(&self) -> &[&str] {
        &[DOCX_MIME]
    }

    fn can_extract_by_extension(&self, filename: &str) -> bool {
        has_extension(filename, &["docx"])
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedContent, ExtractError> {
        let bytes = data.to_vec();
        let content = tokio::task::spawn_blocking(move || extract_docx(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("DOCX parser aborted: {e}")))??;

        debug!("Extracted {} chars from DOCX", content.text.len());
        Ok(content)
    }
}

fn extract_docx(bytes: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(format!("not a DOCX archive: {e}")))?;

    let document_xml = read_entry(&mut archive, "word/document.xml")?
        .ok_or_else(|| ExtractError::Parse("missing word/document.xml".to_string()))?;
    let text = document_text(&document_xml)?;

    let title = match read_entry(&mut archive, "docProps/core.xml")? {
        Some(core) => core_title(&core)?,
        None => None,
    };

    Ok(ExtractedContent {
        text,
        metadata: ContentMetadataInfo {
            title,
            ..Default::default()
        },
    })
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ExtractError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError::Parse(format!("{name}: {e}"))),
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Parse(format!("{name}: {e}")))?;
    Ok(Some(xml))
}

/// Flatten the body of `word/document.xml` into plain text.
pub(crate) fn document_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(e)) if in_run_text => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractError::Parse(format!("bad text run: {e}")))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Parse(format!(
                    "malformed document.xml at {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

fn core_title(xml: &str) -> Result<Option<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut in_title = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"title" => in_title = true,
            Ok(Event::Text(e)) if in_title => {
                let title = e
                    .unescape()
                    .map_err(|e| ExtractError::Parse(format!("bad title: {e}")))?;
                let title = title.trim();
                return Ok((!title.is_empty()).then(|| title.to_string()));
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"title" => return Ok(None),
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(ExtractError::Parse(format!("malformed core.xml: {e}"))),
        }
    }
}
