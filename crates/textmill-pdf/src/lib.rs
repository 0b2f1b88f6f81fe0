use thiserror::Error;

pub mod lopdf_backend;
pub mod mock;

pub use lopdf_backend::LopdfBackend;
pub use mock::{MockBackend, MockResponse};

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("PDF is encrypted")]
    Encrypted,
}

/// The parsed content of a single document.
///
/// `page_count` is always populated from the backend's own page accounting;
/// the metadata fields come from the document's Info dictionary and are
/// absent when the document does not carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub text: String,
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Raw creation-date string as stored in the document (e.g. `D:20240101...`).
    pub creation_date: Option<String>,
}

/// Trait for PDF parsing backends.
///
/// Implementors take the raw bytes of a document and produce its full text
/// plus structural metadata. Implementations must be deterministic for
/// identical input bytes.
pub trait PdfBackend: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, PdfError>;
}
