//! Container readers: turn one archive file into a sequential stream of records.

mod arc;

pub use arc::{ArcReader, ArcSource};

use std::path::Path;

use crate::error::ScanError;
use crate::types::RawRecord;

/// Sequential records from one container. An `Err` item ends the stream.
pub type Records<'a> = Box<dyn Iterator<Item = Result<RawRecord, ScanError>> + Send + 'a>;

/// Opens containers for the walker.
pub trait RecordSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Records<'_>, ScanError>;
}
