//! Record admission and content extraction.

pub mod binary;
pub mod html;

pub use binary::{BinaryExtractor, DocumentExtractor, Extracted};
pub use html::{HtmlStripper, TextNormalizer, collapse_whitespace};

use quick_xml::escape::escape;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::RecordError;
use crate::types::{Outcome, RawContent, RawRecord, SubmissionDocument, is_text_mime};

/// Responses at or above this status are dropped.
pub const MIN_ERROR_STATUS: u16 = 400;

/// Why a record was or was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    MimeNotAllowed,
    ErrorStatus,
}

/// Admits records whose MIME type is in the allow-set and whose status is below 400.
#[derive(Clone, Debug)]
pub struct RecordFilter {
    allowed: HashSet<String>,
}

impl RecordFilter {
    pub fn new(allowed: HashSet<String>) -> Self {
        RecordFilter { allowed }
    }

    pub fn check(&self, record: &RawRecord) -> Verdict {
        if !self.allowed.contains(&record.mime_type) {
            Verdict::MimeNotAllowed
        } else if record.status >= MIN_ERROR_STATUS {
            Verdict::ErrorStatus
        } else {
            Verdict::Admit
        }
    }

    pub fn admits(&self, record: &RawRecord) -> bool {
        self.check(record) == Verdict::Admit
    }
}

/// Fills `text` and `title` of a document. `text/*` goes through the normalizer, the rest through
/// the binary extractor. Results are XML-escaped.
pub struct ContentExtractor {
    normalizer: Arc<dyn TextNormalizer>,
    binary: Arc<dyn BinaryExtractor>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        ContentExtractor::new(Arc::new(HtmlStripper), Arc::new(DocumentExtractor))
    }
}

impl ContentExtractor {
    pub fn new(normalizer: Arc<dyn TextNormalizer>, binary: Arc<dyn BinaryExtractor>) -> Self {
        ContentExtractor { normalizer, binary }
    }

    /// On failure the document's outcome is set to `Error` and the error returned.
    pub fn extract(&self, doc: &mut SubmissionDocument) -> Result<(), RecordError> {
        let result = if is_text_mime(&doc.mime_type) {
            self.extract_text(doc);
            Ok(())
        } else {
            self.extract_binary(doc)
        };
        if let Err(e) = &result {
            doc.outcome = Outcome::Error(e.to_string());
        }
        result
    }

    fn extract_text(&self, doc: &mut SubmissionDocument) {
        let raw = match &doc.raw {
            RawContent::Text(s) => std::borrow::Cow::Borrowed(s.as_str()),
            RawContent::Binary(b) => String::from_utf8_lossy(b),
        };
        let stripped = self.normalizer.strip(&raw);
        let text = escape(stripped.as_str()).into_owned();
        let title = self
            .normalizer
            .title(&raw)
            .map(|t| escape(t.as_str()).into_owned());
        doc.text = text;
        doc.title = title;
    }

    fn extract_binary(&self, doc: &mut SubmissionDocument) -> Result<(), RecordError> {
        let out = match &doc.raw {
            RawContent::Binary(b) => self.binary.extract(&doc.mime_type, b),
            RawContent::Text(s) => self.binary.extract(&doc.mime_type, s.as_bytes()),
        }
        .map_err(RecordError::Extraction)?;
        doc.text = escape(out.text.as_str()).into_owned();
        doc.title = out
            .title
            .filter(|t| !t.trim().is_empty())
            .map(|t| escape(t.as_str()).into_owned());
        Ok(())
    }
}
