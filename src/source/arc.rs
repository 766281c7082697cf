//! ARC (Internet Archive v1/v2) container reader, plain or gzip-compressed.
//!
//! Layout: a `filedesc://` version block, then records separated by blank lines. Each record is a
//! header line `URL IP DATE MIME ... LENGTH` followed by exactly LENGTH bytes holding the captured
//! HTTP response (status line, headers, body).

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use super::{RecordSource, Records};
use crate::error::ScanError;
use crate::types::RawRecord;

/// Read buffer for container files.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Fewest fields in a record header (v1: URL IP DATE MIME LENGTH).
const MIN_HEADER_FIELDS: usize = 5;

/// Opens `.arc` and `.arc.gz` files from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArcSource;

impl RecordSource for ArcSource {
    fn open(&self, path: &Path) -> Result<Records<'_>, ScanError> {
        let file = File::open(path).map_err(|source| ScanError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let gz = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);
        let reader: Box<dyn BufRead + Send> = if gz {
            Box::new(BufReader::with_capacity(
                READ_BUF_SIZE,
                MultiGzDecoder::new(BufReader::new(file)),
            ))
        } else {
            Box::new(BufReader::with_capacity(READ_BUF_SIZE, file))
        };
        Ok(Box::new(ArcReader::new(reader, path)))
    }
}

/// Iterator over the records of one ARC stream. Stops after the first error.
pub struct ArcReader<R> {
    reader: R,
    path: PathBuf,
    /// Bytes consumed from the (decompressed) stream.
    pos: u64,
    index: u64,
    done: bool,
}

impl<R: BufRead> ArcReader<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        ArcReader {
            reader,
            path: path.to_path_buf(),
            pos: 0,
            index: 0,
            done: false,
        }
    }

    fn malformed(&self, offset: u64, reason: impl Into<String>) -> ScanError {
        ScanError::Malformed {
            path: self.path.clone(),
            offset,
            reason: reason.into(),
        }
    }

    fn read_err(&self, source: std::io::Error) -> ScanError {
        ScanError::Read {
            path: self.path.clone(),
            offset: self.pos,
            source,
        }
    }

    /// Next non-blank header line, or None at end of stream.
    fn next_header_line(&mut self) -> Result<Option<(u64, String)>, ScanError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let start = self.pos;
            let n = self
                .reader
                .read_until(b'\n', &mut line)
                .map_err(|e| self.read_err(e))?;
            if n == 0 {
                return Ok(None);
            }
            self.pos += n as u64;
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Some((start, text.to_string())));
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<RawRecord>, ScanError> {
        loop {
            let Some((start, header)) = self.next_header_line()? else {
                return Ok(None);
            };
            let fields: Vec<&str> = header.split_whitespace().collect();
            if fields.len() < MIN_HEADER_FIELDS {
                return Err(self.malformed(start, format!("bad record header '{header}'")));
            }
            let length: u64 = fields[fields.len() - 1]
                .parse()
                .map_err(|_| self.malformed(start, format!("bad record length in '{header}'")))?;
            let url = fields[0].to_string();
            let mime_type = fields[3].to_string();

            let mut block = Vec::with_capacity(length.min(READ_BUF_SIZE as u64 * 16) as usize);
            let read = {
                let mut limited = (&mut self.reader).take(length);
                limited.read_to_end(&mut block)
            };
            let read = read.map_err(|e| self.read_err(e))?;
            self.pos += read as u64;
            if (read as u64) < length {
                return Err(self.malformed(
                    start,
                    format!("truncated record: expected {length} bytes, got {read}"),
                ));
            }

            if url.starts_with("filedesc:") {
                continue;
            }

            let (status, body_offset) = parse_http_head(&block);
            let content = block.split_off(body_offset.min(block.len()));
            let index = self.index;
            self.index += 1;
            return Ok(Some(RawRecord {
                url,
                mime_type,
                status,
                length,
                content,
                body_offset: body_offset as u64,
                container: self.path.clone(),
                index,
            }));
        }
    }
}

impl<R: BufRead> Iterator for ArcReader<R> {
    type Item = Result<RawRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Status code and body offset of a captured HTTP response. Non-HTTP blocks give (0, 0).
fn parse_http_head(block: &[u8]) -> (u16, usize) {
    if !block.starts_with(b"HTTP/") {
        return (0, 0);
    }
    let status = block
        .split(|&b| b == b'\n')
        .next()
        .map(String::from_utf8_lossy)
        .and_then(|line| line.split_whitespace().nth(1).and_then(|s| s.parse().ok()))
        .unwrap_or(0);
    let body_offset = find_subslice(block, b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| find_subslice(block, b"\n\n").map(|i| i + 2))
        .unwrap_or(block.len());
    (status, body_offset)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
