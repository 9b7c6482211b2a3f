//! v4 index files (`md.idx`): the header followed by fixed 64-byte rows.
//!
//! ```text
//! +------+------+--------+---------+---------+---------+-----------+----------+
//! | step | rank | pg ptr | var ptr | att ptr | end ptr | timestamp | reserved |
//! +------+------+--------+---------+---------+---------+-----------+----------+
//!   8 little-endian u64 per row, one row per (step, rank) pair
//! ```

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, warn};

use super::cursor::ByteCursor;
use super::format::*;
use super::header::{FormatHeader, FormatVersion};
use crate::util::{BlockContext, BlockKind, Result};

/// One index row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IndexRecordV4 {
    pub step: u64,
    pub rank: u64,
    /// Offset of the process group in the data file.
    pub pg_ptr: u64,
    /// Offset of the variables index in the metadata file.
    pub var_ptr: u64,
    /// Offset of the attributes index in the metadata file.
    pub att_ptr: u64,
    /// End of this rank's metadata in the metadata file.
    pub end_ptr: u64,
    pub timestamp: u64,
    pub reserved: u64,
}

impl IndexRecordV4 {
    pub fn from_row(row: &[u8; INDEX_V4_ROW_SIZE]) -> Self {
        let mut v = [0u64; 8];
        LittleEndian::read_u64_into(row, &mut v);
        Self {
            step: v[0],
            rank: v[1],
            pg_ptr: v[2],
            var_ptr: v[3],
            att_ptr: v[4],
            end_ptr: v[5],
            timestamp: v[6],
            reserved: v[7],
        }
    }

    pub fn to_row(&self) -> [u8; INDEX_V4_ROW_SIZE] {
        let v = [
            self.step,
            self.rank,
            self.pg_ptr,
            self.var_ptr,
            self.att_ptr,
            self.end_ptr,
            self.timestamp,
            self.reserved,
        ];
        let mut row = [0u8; INDEX_V4_ROW_SIZE];
        LittleEndian::write_u64_into(&v, &mut row);
        row
    }
}

/// Decoded v4 index file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexV4 {
    pub header: FormatHeader,
    pub records: Vec<IndexRecordV4>,
    /// Stray bytes after the last complete row.
    pub trailing_bytes: u64,
}

impl IndexV4 {
    /// Decode a whole index file.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let header = FormatHeader::decode(&mut cursor).in_block(BlockKind::Header, 0)?;
        header.ensure_native()?;
        header.ensure_version(FormatVersion::V4)?;
        Self::decode_rows(header, &mut cursor)
    }

    /// Decode the rows following an already decoded header.
    pub fn decode_rows(header: FormatHeader, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let mut records = Vec::with_capacity(cursor.remaining() as usize / INDEX_V4_ROW_SIZE);
        while cursor.remaining() >= INDEX_V4_ROW_SIZE as u64 {
            let row: [u8; INDEX_V4_ROW_SIZE] = cursor
                .read_array()
                .in_block(BlockKind::IndexRow, records.len() as u64)?;
            records.push(IndexRecordV4::from_row(&row));
        }

        let trailing_bytes = cursor.remaining();
        if trailing_bytes > 0 {
            warn!(
                offset = cursor.tell(),
                trailing_bytes, "index has stray bytes after the last complete row"
            );
            cursor.skip(trailing_bytes)?;
        }
        debug!(rows = records.len(), "decoded v4 index");
        Ok(Self { header, records, trailing_bytes })
    }

    /// Rows of one step, in file order.
    pub fn step(&self, step: u64) -> impl Iterator<Item = &IndexRecordV4> {
        self.records.iter().filter(move |r| r.step == step)
    }

    /// Distinct step numbers, in order of first appearance.
    pub fn steps(&self) -> Vec<u64> {
        let mut steps = Vec::new();
        for r in &self.records {
            if !steps.contains(&r.step) {
                steps.push(r.step);
            }
        }
        steps
    }
}
