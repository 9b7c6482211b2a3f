//! BP format constants: header layout, framing tags and record kinds.

/// Size of the header shared by index, metadata and data files.
pub const HEADER_SIZE: usize = 64;

/// Length of the NUL-padded version string at the start of the header.
pub const VERSION_STRING_LEN: usize = 24;

/// Offsets of the single-byte version components.
pub const MAJOR_OFFSET: usize = 24;
pub const MINOR_OFFSET: usize = 25;
pub const MICRO_OFFSET: usize = 26;

/// Offset of the endianness flag (0 = little-endian, 1 = foreign).
pub const ENDIAN_OFFSET: usize = 28;

/// Offset of the has-subfiles flag.
pub const SUBFILES_OFFSET: usize = 30;

/// Offset of the format generation byte (4 or 5).
pub const FORMAT_VERSION_OFFSET: usize = 31;

/// Offset of the 8-byte "is live" flag.
pub const IS_LIVE_OFFSET: usize = 56;

/// All framing tags are four ASCII bytes.
pub const TAG_SIZE: usize = 4;

pub const PG_OPEN_TAG: &[u8; 4] = b"[PGI";
pub const PG_CLOSE_TAG: &[u8; 4] = b"PGI]";
pub const VMD_OPEN_TAG: &[u8; 4] = b"[VMD";
pub const VMD_CLOSE_TAG: &[u8; 4] = b"VMD]";
pub const AMD_OPEN_TAG: &[u8; 4] = b"[AMD";
pub const AMD_CLOSE_TAG: &[u8; 4] = b"AMD]";

/// Opening tag plus the 8-byte block length that follows it.
pub const BLOCK_PREFIX_SIZE: usize = TAG_SIZE + 8;

/// Boolean bytes.
pub const FLAG_YES: u8 = b'y';
pub const FLAG_NO: u8 = b'n';

/// Bytes per dimension: three (flag, u64) pairs.
pub const DIMENSION_ENTRY_SIZE: usize = 3 * 9;

/// One v4 index row: 8 little-endian u64 values.
pub const INDEX_V4_ROW_SIZE: usize = 64;

/// v5 index record kinds.
pub const RECORD_STEP: u8 = b's';
pub const RECORD_WRITER_MAP: u8 = b'w';
pub const RECORD_META_METADATA: u8 = b'm';

/// v5 record prefix: 1-byte kind plus 8-byte length.
pub const RECORD_PREFIX_SIZE: usize = 9;

/// Absolute byte range inside a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    #[inline]
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Render raw tag bytes for diagnostics.
pub fn tag_display(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                (b as char).to_string()
            } else {
                format!("\\x{b:02x}")
            }
        })
        .collect()
}
