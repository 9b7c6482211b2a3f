//! v5 index files (`md.idx`): the header followed by tagged records.
//!
//! ```text
//! +------+------------+--------------------------------------------------+
//! | kind | length u64 | payload (length bytes)                           |
//! +------+------------+--------------------------------------------------+
//!
//!  'w'  writer count, aggregator count, subfile count, rank -> subfile[]
//!  's'  metadata pos, metadata size, flush count,
//!       per writer: flush count x (data pos, data size), final data pos
//!  'm'  opaque meta-metadata
//! ```
//!
//! All fields are little-endian u64. A step record can only be sized once the
//! writer count is known, so decoding threads a [`DecodeContextV5`] from one
//! record to the next.

use std::fmt;

use tracing::{debug, trace, warn};

use super::cursor::ByteCursor;
use super::format::*;
use super::header::{FormatHeader, FormatVersion};
use super::options::DecodeOptions;
use crate::util::{BlockContext, BlockKind, Error, Result};

/// Record tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    WriterMap,
    Step,
    MetaMetadata,
    Unknown(u8),
}

impl RecordKind {
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            RECORD_WRITER_MAP => Self::WriterMap,
            RECORD_STEP => Self::Step,
            RECORD_META_METADATA => Self::MetaMetadata,
            other => Self::Unknown(other),
        }
    }

    pub const fn tag(self) -> u8 {
        match self {
            Self::WriterMap => RECORD_WRITER_MAP,
            Self::Step => RECORD_STEP,
            Self::MetaMetadata => RECORD_META_METADATA,
            Self::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriterMap => f.write_str("writer map"),
            Self::Step => f.write_str("step"),
            Self::MetaMetadata => f.write_str("meta-metadata"),
            Self::Unknown(tag) => write!(f, "unknown(0x{tag:02x})"),
        }
    }
}

/// Writer cardinality in effect for the records that follow a writer map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WriterLayout {
    pub writer_count: u64,
    pub aggregator_count: u64,
    pub subfile_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterMap {
    /// Absolute offset of the record kind byte.
    pub offset: u64,
    pub layout: WriterLayout,
    /// Subfile index of every writer rank.
    pub rank_to_subfile: Vec<u64>,
}

/// One flushed data segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlushLocation {
    pub data_pos: u64,
    pub data_size: u64,
}

/// Data locations of one writer rank within a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterFlushes {
    pub flushes: Vec<FlushLocation>,
    /// Where the writer's unflushed remainder starts.
    pub final_pos: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRecordV5 {
    pub offset: u64,
    /// Ordinal of this step record in the file, from 0.
    pub step: u64,
    pub metadata_pos: u64,
    pub metadata_size: u64,
    pub flush_count: u64,
    /// One entry per writer rank.
    pub writers: Vec<WriterFlushes>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordV5 {
    WriterMap(WriterMap),
    Step(StepRecordV5),
    /// Payload location only.
    MetaMetadata(ByteRange),
    /// Skipped in forensic mode.
    Unknown { tag: u8, range: ByteRange },
}

impl RecordV5 {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::WriterMap(_) => RecordKind::WriterMap,
            Self::Step(_) => RecordKind::Step,
            Self::MetaMetadata(_) => RecordKind::MetaMetadata,
            Self::Unknown { tag, .. } => RecordKind::Unknown(*tag),
        }
    }
}

/// State carried from one record to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeContextV5 {
    /// Layout from the most recent writer map.
    pub layout: Option<WriterLayout>,
    /// Ordinal the next step record receives.
    pub next_step: u64,
}

impl DecodeContextV5 {
    /// Decode one record at the cursor and return it with the updated context.
    pub fn decode_record(
        self,
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> Result<(RecordV5, Self)> {
        let offset = cursor.tell();
        let tag = cursor.read_u8()?;
        let length_offset = cursor.tell();
        let length = cursor.read_u64()?;
        let mut body = cursor.child(length, length_offset)?;
        let payload = ByteRange::new(body.tell(), length);

        let (record, next) = match RecordKind::from_tag(tag) {
            RecordKind::WriterMap => {
                let map = decode_writer_map(offset, &mut body)?;
                let next = Self { layout: Some(map.layout), ..self };
                (RecordV5::WriterMap(map), next)
            }
            RecordKind::Step => {
                let layout = self.layout.ok_or(Error::MissingWriterMap { offset })?;
                let step = decode_step(offset, self.next_step, layout, &mut body)?;
                let next = Self { next_step: self.next_step + 1, ..self };
                (RecordV5::Step(step), next)
            }
            RecordKind::MetaMetadata => {
                body.skip(length)?;
                (RecordV5::MetaMetadata(payload), self)
            }
            RecordKind::Unknown(tag) => {
                if !options.is_forensic() {
                    return Err(Error::UnknownRecordKind { offset, tag });
                }
                warn!(offset, tag, length, "skipping unknown index record");
                body.skip(length)?;
                (RecordV5::Unknown { tag, range: payload }, self)
            }
        };

        if !body.is_at_end() {
            return Err(Error::LengthMismatch {
                offset,
                declared: length,
                consumed: body.tell() - payload.offset,
            });
        }
        cursor.seek(body.limit())?;
        Ok((record, next))
    }
}

fn decode_writer_map(offset: u64, body: &mut ByteCursor<'_>) -> Result<WriterMap> {
    let layout = WriterLayout {
        writer_count: body.read_u64()?,
        aggregator_count: body.read_u64()?,
        subfile_count: body.read_u64()?,
    };
    let rank_to_subfile = body.read_u64_vec(layout.writer_count)?;
    trace!(
        offset,
        writers = layout.writer_count,
        aggregators = layout.aggregator_count,
        subfiles = layout.subfile_count,
        "writer map"
    );
    Ok(WriterMap { offset, layout, rank_to_subfile })
}

fn decode_step(
    offset: u64,
    step: u64,
    layout: WriterLayout,
    body: &mut ByteCursor<'_>,
) -> Result<StepRecordV5> {
    let metadata_pos = body.read_u64()?;
    let metadata_size = body.read_u64()?;
    let flush_count = body.read_u64()?;

    let per_writer = flush_count.checked_mul(2).and_then(|n| n.checked_add(1)).unwrap_or(u64::MAX);
    let values = body.read_u64_vec(layout.writer_count.checked_mul(per_writer).unwrap_or(u64::MAX))?;
    let writers = values
        .chunks_exact(per_writer as usize)
        .map(|chunk| {
            let (pairs, last) = chunk.split_at(chunk.len() - 1);
            WriterFlushes {
                flushes: pairs
                    .chunks_exact(2)
                    .map(|p| FlushLocation { data_pos: p[0], data_size: p[1] })
                    .collect(),
                final_pos: last[0],
            }
        })
        .collect();

    trace!(offset, step, metadata_pos, metadata_size, flush_count, "step record");
    Ok(StepRecordV5 {
        offset,
        step,
        metadata_pos,
        metadata_size,
        flush_count,
        writers,
    })
}

/// Decoded v5 index file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexV5 {
    pub header: FormatHeader,
    pub records: Vec<RecordV5>,
}

impl IndexV5 {
    pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let header = FormatHeader::decode(&mut cursor).in_block(BlockKind::Header, 0)?;
        header.ensure_native()?;
        header.ensure_version(FormatVersion::V5)?;
        Self::decode_records(header, &mut cursor, options)
    }

    /// Decode the records following an already decoded header.
    pub fn decode_records(
        header: FormatHeader,
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let mut records = Vec::new();
        let mut ctx = DecodeContextV5::default();
        while !cursor.is_at_end() {
            let (record, next) = ctx
                .decode_record(cursor, options)
                .in_block(BlockKind::IndexRecord, records.len() as u64)?;
            records.push(record);
            ctx = next;
        }
        debug!(records = records.len(), steps = ctx.next_step, "decoded v5 index");
        Ok(Self { header, records })
    }

    pub fn writer_maps(&self) -> impl Iterator<Item = &WriterMap> {
        self.records.iter().filter_map(|r| match r {
            RecordV5::WriterMap(m) => Some(m),
            _ => None,
        })
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepRecordV5> {
        self.records.iter().filter_map(|r| match r {
            RecordV5::Step(s) => Some(s),
            _ => None,
        })
    }

    /// Writer map in effect for the given step ordinal.
    pub fn writer_map_for(&self, step: u64) -> Option<&WriterMap> {
        let mut current = None;
        for record in &self.records {
            match record {
                RecordV5::WriterMap(m) => current = Some(m),
                RecordV5::Step(s) if s.step == step => return current,
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bp::testutil::encode_header;

    fn record(tag: u8, values: &[u64]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(values.len() as u64 * 8).to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    fn writer_map(writers: u64) -> Vec<u8> {
        let mut values = vec![writers, 1, 2];
        values.extend((0..writers).map(|r| r % 2));
        record(b'w', &values)
    }

    fn step(writers: u64, flush_count: u64, base: u64) -> Vec<u8> {
        let mut values = vec![base, 100, flush_count];
        for w in 0..writers {
            for f in 0..flush_count {
                values.extend([base + w * 10 + f, 5]);
            }
            values.push(base + w * 10 + 9);
        }
        record(b's', &values)
    }

    fn index(records: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = encode_header(5);
        for r in records {
            bytes.extend_from_slice(r);
        }
        bytes
    }

    #[test]
    fn test_writer_map_and_steps() {
        let bytes = index(&[writer_map(4), step(4, 1, 0), step(4, 1, 1000)]);
        let idx = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(idx.records.len(), 3);

        let map = idx.writer_maps().next().unwrap();
        assert_eq!(map.layout.writer_count, 4);
        assert_eq!(map.layout.subfile_count, 2);
        assert_eq!(map.rank_to_subfile, vec![0, 1, 0, 1]);

        let steps: Vec<_> = idx.steps().collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].step, 1);
        assert_eq!(steps[1].metadata_pos, 1000);
        for s in &steps {
            assert_eq!(s.writers.len(), 4);
            assert!(s.writers.iter().all(|w| w.flushes.len() == 1));
        }
        assert_eq!(steps[0].writers[2].flushes[0], FlushLocation { data_pos: 20, data_size: 5 });
        assert_eq!(steps[0].writers[2].final_pos, 29);
        assert_eq!(idx.writer_map_for(1).map(|m| m.offset), Some(64));
    }

    #[test]
    fn test_step_before_writer_map() {
        let bytes = index(&[step(1, 1, 0), writer_map(1)]);
        let err = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err.root(), Error::MissingWriterMap { offset: 64 }));
    }

    #[test]
    fn test_second_writer_map_replaces_first() {
        let bytes = index(&[writer_map(2), step(2, 0, 0), writer_map(3), step(3, 2, 0)]);
        let idx = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap();
        let steps: Vec<_> = idx.steps().collect();
        assert_eq!(steps[0].writers.len(), 2);
        assert!(steps[0].writers[0].flushes.is_empty());
        assert_eq!(steps[1].writers.len(), 3);
        assert_eq!(steps[1].writers[0].flushes.len(), 2);
        assert_eq!(idx.writer_map_for(1).map(|m| m.layout.writer_count), Some(3));
    }

    #[test]
    fn test_context_is_threaded() {
        let bytes = [writer_map(2), step(2, 1, 0)].concat();
        let mut c = ByteCursor::new(&bytes);
        let opts = DecodeOptions::default();
        let ctx = DecodeContextV5::default();
        let (r, ctx) = ctx.decode_record(&mut c, &opts).unwrap();
        assert_eq!(r.kind(), RecordKind::WriterMap);
        assert_eq!(ctx.layout.map(|l| l.writer_count), Some(2));
        assert_eq!(ctx.next_step, 0);
        let (r, ctx) = ctx.decode_record(&mut c, &opts).unwrap();
        assert_eq!(r.kind(), RecordKind::Step);
        assert_eq!(ctx.next_step, 1);
        assert!(c.is_at_end());
    }

    #[test]
    fn test_meta_metadata_and_unknown() {
        let mut mm = vec![b'm'];
        mm.extend_from_slice(&3u64.to_le_bytes());
        mm.extend_from_slice(b"abc");
        let unknown = record(b'q', &[1]);
        let bytes = index(&[writer_map(1), mm, unknown]);

        let err = IndexV5::decode(&bytes, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err.root(), Error::UnknownRecordKind { tag: b'q', .. }));
        assert_eq!(err.block_path(), vec![crate::util::BlockId::new(BlockKind::IndexRecord, 2)]);

        let idx = IndexV5::decode(&bytes, &DecodeOptions::forensic()).unwrap();
        let wm_len = writer_map(1).len() as u64;
        assert_eq!(idx.records[1], RecordV5::MetaMetadata(ByteRange::new(64 + wm_len + 9, 3)));
        assert!(matches!(idx.records[2], RecordV5::Unknown { tag: b'q', range } if range.length == 8));
    }

    #[test]
    fn test_record_length_must_match() {
        let mut wm = writer_map(1);
        let len = u64::from_le_bytes(wm[1..9].try_into().unwrap());
        wm[1..9].copy_from_slice(&(len + 8).to_le_bytes());
        wm.extend_from_slice(&[0; 8]);
        let err = IndexV5::decode(&index(&[wm]), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err.root(), Error::LengthMismatch { declared: 40, consumed: 32, .. }));

        // A step claiming more flushes than its record holds overflows.
        let mut s = step(1, 1, 0);
        s[25..33].copy_from_slice(&5u64.to_le_bytes());
        let err = IndexV5::decode(&index(&[writer_map(1), s]), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err.root(), Error::Overflow { .. }));
    }

    #[test]
    fn test_truncated_record() {
        let bytes = index(&[writer_map(4), step(4, 1, 0)]);
        for cut in 1..40 {
            let err = IndexV5::decode(&bytes[..bytes.len() - cut], &DecodeOptions::default()).unwrap_err();
            assert!(err.is_truncation(), "cut {cut}: {err}");
        }
    }
}
