//! Public and internal types for the submitter pipeline.

use std::path::PathBuf;

/// One captured document inside a container, as yielded by a [`RecordSource`](crate::source::RecordSource).
#[derive(Clone, Debug)]
pub struct RawRecord {
    pub url: String,
    pub mime_type: String,
    /// HTTP status from the captured response; 0 when the record carries no HTTP status line.
    pub status: u16,
    /// Archive length from the record header (headers + body).
    pub length: u64,
    /// Body bytes after the captured response headers.
    pub content: Vec<u8>,
    /// Byte offset of the body within the record block.
    pub body_offset: u64,
    pub container: PathBuf,
    /// Position of the record in its container, counting every record (filtered or not).
    pub index: u64,
}

/// Raw content of an admitted record: text types are decoded up front, everything else stays bytes.
#[derive(Clone, Debug)]
pub enum RawContent {
    Text(String),
    Binary(Vec<u8>),
}

/// Result of processing one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    Error(String),
}

/// A document on its way to the index. Owned by exactly one worker once dispatched.
#[derive(Clone, Debug)]
pub struct SubmissionDocument {
    pub url: String,
    pub mime_type: String,
    pub container: PathBuf,
    pub offset: u64,
    pub raw: RawContent,
    /// Extracted title, already XML-escaped.
    pub title: Option<String>,
    /// Normalized text, already XML-escaped.
    pub text: String,
    pub outcome: Outcome,
}

impl SubmissionDocument {
    /// Build a pending document from an admitted record. `text/*` bodies are decoded lossily as UTF-8.
    pub fn from_record(record: RawRecord) -> Self {
        let raw = if is_text_mime(&record.mime_type) {
            RawContent::Text(String::from_utf8_lossy(&record.content).into_owned())
        } else {
            RawContent::Binary(record.content)
        };
        SubmissionDocument {
            url: record.url,
            mime_type: record.mime_type,
            container: record.container,
            offset: record.index,
            raw,
            title: None,
            text: String::new(),
            outcome: Outcome::Pending,
        }
    }
}

/// True for `text/*` MIME types (the text branch of extraction).
pub fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text")
}

/// Destination field names for each semantic role. Loaded once; shared read-only by workers.
///
/// `title` and `offset` may be empty, in which case the field is never emitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMapping {
    pub url: String,
    pub title: String,
    pub text: String,
    pub mime_type: String,
    pub cache: String,
    pub offset: String,
}

/// A successfully submitted document, buffered for the batched `indexed_pages` write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedPage {
    pub url: String,
    /// Nanoseconds since the Unix epoch.
    pub time_ns: i64,
    pub mime_type: String,
    pub container: String,
    pub offset: u64,
}

/// A failed document, written to `submission_errors` immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionErrorRow {
    pub url: String,
    pub time_ns: i64,
    pub mime_type: String,
    pub container: String,
    pub offset: u64,
    pub message: String,
}

/// Row counts of the persisted relations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub processed_files: usize,
    pub indexed_pages: usize,
    pub submission_errors: usize,
}

/// Per-cycle totals returned by [`CycleController::run_cycle`](crate::pipeline::CycleController::run_cycle).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub containers_processed: usize,
    /// In-progress or already-processed containers.
    pub containers_skipped: usize,
    /// Containers that could not be opened or parsed; left unmarked for the next cycle.
    pub containers_failed: usize,
    pub records_dispatched: u64,
    pub records_filtered: u64,
    /// Documents accepted by the index and flushed to `indexed_pages`.
    pub submitted: u64,
    pub failed: u64,
}
