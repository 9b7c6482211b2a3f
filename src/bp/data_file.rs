//! Data file scanning.
//!
//! A data file is an optional 64-byte header followed by process groups laid
//! end to end, possibly padded with zeros up to an alignment boundary.
//!
//! In strict mode the first error aborts the scan. In forensic mode the error
//! is recorded and the scan resumes at the declared end of the broken group
//! when that end lands on another group (or the end of the file), and at the
//! next `[PGI` tag otherwise.

use tracing::{debug, info, warn};

use super::cursor::ByteCursor;
use super::format::*;
use super::header::FormatHeader;
use super::options::DecodeOptions;
use super::process_group::ProcessGroup;
use crate::util::{BlockContext, BlockKind, Error, Result};

/// Everything recovered from one data file.
#[derive(Debug, Default)]
pub struct DataFileReport {
    pub header: Option<FormatHeader>,
    pub process_groups: Vec<ProcessGroup>,
    /// Errors recorded in forensic mode, each tagged with its process group.
    pub errors: Vec<Error>,
    /// Bytes after the last process group that were not decoded.
    pub trailing_bytes: u64,
}

impl DataFileReport {
    /// No errors were recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn variable_count(&self) -> usize {
        self.process_groups.iter().map(|pg| pg.variables.len()).sum()
    }

    pub fn attribute_count(&self) -> usize {
        self.process_groups.iter().map(|pg| pg.attributes.len()).sum()
    }
}

/// Scans a data file for process groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataFileDecoder {
    options: DecodeOptions,
}

impl DataFileDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn decode(&self, data: &[u8]) -> Result<DataFileReport> {
        let mut cursor = ByteCursor::new(data);
        let mut report = DataFileReport::default();

        if has_header(data) {
            match FormatHeader::decode(&mut cursor).in_block(BlockKind::Header, 0) {
                Ok(header) => {
                    header.ensure_native()?;
                    report.header = Some(header);
                }
                Err(e) if self.options.is_forensic() && data.len() >= HEADER_SIZE => {
                    warn!(error = %e, "unreadable header, scanning past it");
                    report.errors.push(e);
                    cursor.seek(HEADER_SIZE as u64)?;
                }
                Err(e) => return Err(e),
            }
        }

        let mut index = 0u64;
        while !cursor.is_at_end() {
            if cursor.rest().iter().all(|&b| b == 0) {
                report.trailing_bytes = cursor.remaining();
                debug!(offset = cursor.tell(), bytes = report.trailing_bytes, "zero padding at end of file");
                break;
            }

            let start = cursor.tell();
            match ProcessGroup::decode(&mut cursor, &self.options).in_block(BlockKind::ProcessGroup, index) {
                Ok(pg) => report.process_groups.push(pg),
                Err(e) if self.options.is_forensic() => {
                    warn!(offset = start, error = %e, "process group failed to decode");
                    report.errors.push(e);
                    match resume_offset(data, start) {
                        Some(next) => {
                            info!(from = start, to = next, "resuming scan");
                            cursor.seek(next)?;
                        }
                        None => {
                            report.trailing_bytes = data.len() as u64 - start;
                            warn!(offset = start, bytes = report.trailing_bytes, "no further process group found");
                            break;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
            index += 1;
        }

        debug!(
            groups = report.process_groups.len(),
            errors = report.errors.len(),
            "decoded data file"
        );
        Ok(report)
    }
}

/// A file starts with a header unless it starts (or is a prefix of) a group tag.
fn has_header(data: &[u8]) -> bool {
    let n = data.len().min(TAG_SIZE);
    data[..n] != PG_OPEN_TAG[..n]
}

/// Where to continue after a group at `start` failed.
fn resume_offset(data: &[u8], start: u64) -> Option<u64> {
    let start = start as usize;
    if let Some(end) = declared_end(data, start) {
        if end == data.len() || data[end..].starts_with(PG_OPEN_TAG) {
            return Some(end as u64);
        }
    }
    find_tag(data, start + 1).map(|pos| pos as u64)
}

/// Declared end of a group at `start`, if its tag and length are readable
/// and the end lies past the length field and inside the file.
fn declared_end(data: &[u8], start: usize) -> Option<usize> {
    let block = data.get(start..start + BLOCK_PREFIX_SIZE)?;
    if &block[..TAG_SIZE] != PG_OPEN_TAG {
        return None;
    }
    let mut length = [0u8; 8];
    length.copy_from_slice(&block[TAG_SIZE..]);
    let end = (start + TAG_SIZE).checked_add(usize::try_from(u64::from_le_bytes(length)).ok()?)?;
    (end > start + BLOCK_PREFIX_SIZE && end <= data.len()).then_some(end)
}

fn find_tag(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(TAG_SIZE)
        .position(|w| w == PG_OPEN_TAG)
        .map(|pos| from + pos)
}
