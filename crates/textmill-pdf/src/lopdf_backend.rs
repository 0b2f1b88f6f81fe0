use lopdf::Document;

use crate::{ParsedDocument, PdfBackend, PdfError};

/// PDF parsing backend built on [`lopdf`].
///
/// Pure-Rust: no system libraries required. Text is extracted page by page
/// and joined with newlines; metadata comes from the trailer's Info
/// dictionary when present.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, PdfError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfError::OpenError(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let page_count = page_numbers.len();

        let mut pages_text = Vec::with_capacity(page_count);
        for page_num in page_numbers {
            let page_text = doc
                .extract_text(&[page_num])
                .map_err(|e| PdfError::ExtractionError(e.to_string()))?;
            pages_text.push(page_text);
        }
        let text = pages_text.join("\n");

        let (title, author, creation_date) = info_metadata(&doc);
        tracing::debug!(page_count, chars = text.len(), "parsed PDF");

        Ok(ParsedDocument {
            text,
            page_count,
            title,
            author,
            creation_date,
        })
    }
}

/// Read Title, Author, and CreationDate from the trailer's Info dictionary.
/// Every lookup is tolerant: a malformed or absent entry yields `None`.
fn info_metadata(doc: &Document) -> (Option<String>, Option<String>, Option<String>) {
    let dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| obj.as_reference().ok())
        .and_then(|id| doc.get_object(id).ok())
        .and_then(|obj| obj.as_dict().ok());

    let Some(dict) = dict else {
        return (None, None, None);
    };

    let field = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|obj| obj.as_str().ok())
            .and_then(decode_pdf_string)
    };

    (field(b"Title"), field(b"Author"), field(b"CreationDate"))
}

/// Decode a PDF text string: UTF-16BE when BOM-prefixed, UTF-8 otherwise.
/// Returns `None` for empty or undecodable strings.
fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    let s = if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units).ok()?
    } else {
        std::str::from_utf8(bytes).ok()?.to_string()
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
