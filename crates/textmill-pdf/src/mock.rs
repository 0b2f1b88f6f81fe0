//! Mock parsing backend for testing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{ParsedDocument, PdfBackend, PdfError};

/// A configurable mock response for [`MockBackend`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a successful parse.
    Parsed {
        text: String,
        page_count: usize,
        title: Option<String>,
        author: Option<String>,
    },
    /// Simulate a parse failure.
    Error(String),
}

/// A hand-rolled mock implementing [`PdfBackend`] for tests.
///
/// Supports:
/// - A fixed response (used for every call), **or**
/// - A sequence of responses (one per call, repeating the last if exhausted).
/// - Optional per-call latency.
/// - Call counting via [`call_count()`](MockBackend::call_count).
pub struct MockBackend {
    /// If non-empty, each call pops the next response (last is repeated if exhausted).
    responses: Mutex<Vec<MockResponse>>,
    /// Fallback when the sequence is empty (or single-response mode).
    fallback: MockResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl MockBackend {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that echoes the input bytes back as text, one page.
    pub fn echo() -> Self {
        Self::new(MockResponse::Parsed {
            text: String::new(),
            page_count: 1,
            title: None,
            author: None,
        })
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        responses.reverse(); // pop from the end
        let fallback = responses
            .first()
            .cloned()
            .unwrap_or(MockResponse::Error("empty sequence".into()));
        Self {
            responses: Mutex::new(responses),
            fallback,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Add a fixed latency to every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times [`parse`](PdfBackend::parse) has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl PdfBackend for MockBackend {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, PdfError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let response = {
            let mut seq = self.responses.lock().unwrap_or_else(|e| e.into_inner());
            match seq.len() {
                0 => self.fallback.clone(),
                1 => seq[0].clone(),
                _ => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            }
        };

        match response {
            MockResponse::Parsed {
                text,
                page_count,
                title,
                author,
            } => {
                // Empty canned text means "echo the input bytes" so tests can
                // assert on per-file content without a sequence.
                let text = if text.is_empty() {
                    String::from_utf8_lossy(bytes).into_owned()
                } else {
                    text
                };
                Ok(ParsedDocument {
                    text,
                    page_count,
                    title,
                    author,
                    creation_date: None,
                })
            }
            MockResponse::Error(msg) => Err(PdfError::ExtractionError(msg)),
        }
    }
}
