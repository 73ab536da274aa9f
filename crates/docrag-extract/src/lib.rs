//! # docrag-extract
//!
//! Plain-text extraction for the docrag ingestion pipeline.
//!
//! ## Supported Formats
//!
//! | Extractor | Formats | Notes |
//! |-----------|---------|-------|
//! | [`TextExtractor`] | `.txt`, `.md` | UTF-8, BOM stripped |
//! | [`PdfExtractor`] | `.pdf` | Text via pdf-extract, title/author/page count via lopdf |
//! | [`DocxExtractor`] | `.docx` | Paragraph text from `word/document.xml` |
//!
//! Anything else is rejected with
//! [`ExtractError::UnsupportedType`](docrag_core::ExtractError::UnsupportedType).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrag_extract::ExtractorRegistry;
//!
//! let registry = ExtractorRegistry::with_defaults();
//! let content = registry
//!     .extract_bytes(&bytes, Some("application/pdf"), Some("report.pdf"))
//!     .await?;
//! ```

pub mod docx;
pub mod pdf;
pub mod registry;
pub mod text;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use text::TextExtractor;
