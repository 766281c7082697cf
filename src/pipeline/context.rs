//! Per-cycle worker context: the read-only collaborators every worker shares, plus the
//! success buffer and failure counter for the cycle.

use log::{debug, warn};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::tools::{now_ns, path_to_db_string};
use crate::error::RecordError;
use crate::extract::ContentExtractor;
use crate::index_client::IndexClient;
use crate::payload::{CustomFields, DocumentBuilder};
use crate::state::StateStore;
use crate::types::{IndexedPage, Outcome, SubmissionDocument, SubmissionErrorRow};

/// Shared by the walker (flushes) and all workers (processing). Built fresh each cycle.
pub struct SubmitContext {
    pub extractor: Arc<ContentExtractor>,
    pub builder: Arc<DocumentBuilder>,
    pub custom: Arc<dyn CustomFields>,
    pub client: Arc<dyn IndexClient>,
    pub store: Arc<dyn StateStore>,
    indexed: Mutex<Vec<IndexedPage>>,
    failed: AtomicU64,
}

impl SubmitContext {
    pub fn new(
        extractor: Arc<ContentExtractor>,
        builder: Arc<DocumentBuilder>,
        custom: Arc<dyn CustomFields>,
        client: Arc<dyn IndexClient>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        SubmitContext {
            extractor,
            builder,
            custom,
            client,
            store,
            indexed: Mutex::new(Vec::new()),
            failed: AtomicU64::new(0),
        }
    }

    /// Worker entry point: extract, render, submit, then record the outcome.
    /// Successes are buffered; failures are written to the store right away.
    pub fn process(&self, mut doc: SubmissionDocument) -> Outcome {
        let result = catch_unwind(AssertUnwindSafe(|| self.submit_document(&mut doc)))
            .unwrap_or_else(|payload| Err(RecordError::Panicked(panic_message(&*payload))));
        match result {
            Ok(()) => {
                doc.outcome = Outcome::Success;
                self.buffer_success(&doc);
            }
            Err(e) => {
                let message = e.to_string();
                warn!("{} ({}): {}", doc.url, doc.container.display(), message);
                doc.outcome = Outcome::Error(message.clone());
                self.record_failure(&doc, message);
            }
        }
        doc.outcome
    }

    fn submit_document(&self, doc: &mut SubmissionDocument) -> Result<(), RecordError> {
        self.extractor.extract(doc)?;
        let custom = self.custom.fields(doc);
        let payload = self.builder.render(doc, &custom);
        self.client.submit(&payload)?;
        debug!("submitted {}", doc.url);
        Ok(())
    }

    fn buffer_success(&self, doc: &SubmissionDocument) {
        let page = IndexedPage {
            url: doc.url.clone(),
            time_ns: now_ns(),
            mime_type: doc.mime_type.clone(),
            container: path_to_db_string(&doc.container),
            offset: doc.offset,
        };
        self.indexed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(page);
    }

    fn record_failure(&self, doc: &SubmissionDocument, message: String) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let row = SubmissionErrorRow {
            url: doc.url.clone(),
            time_ns: now_ns(),
            mime_type: doc.mime_type.clone(),
            container: path_to_db_string(&doc.container),
            offset: doc.offset,
            message,
        };
        if let Err(e) = self.store.record_error(&row) {
            warn!("could not record failure for {}: {}", row.url, e);
        }
    }

    /// Write buffered successes to `indexed_pages`. Returns how many were taken from the buffer;
    /// if the write fails they are still counted as submitted (the index has them).
    pub fn flush_indexed(&self) -> u64 {
        let batch = std::mem::take(
            &mut *self.indexed.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if batch.is_empty() {
            return 0;
        }
        if let Err(e) = self.store.record_indexed(&batch) {
            warn!("could not record {} indexed pages: {}", batch.len(), e);
        }
        batch.len() as u64
    }

    /// Failures recorded so far this cycle.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
