//! The 64-byte header shared by index, metadata and data files.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use super::cursor::ByteCursor;
use super::format::*;
use crate::util::{Error, Result};

/// On-disk format generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    /// Fixed 64-byte index rows.
    V4,
    /// Tagged index records with a writer map.
    V5,
}

impl FormatVersion {
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            4 => Some(Self::V4),
            5 => Some(Self::V5),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V5 => 5,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BP{}", self.as_u8())
    }
}

/// Decoded file header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatHeader {
    /// Version string, NUL padding removed.
    pub version_string: String,
    pub major: u8,
    pub minor: u8,
    pub micro: u8,
    /// False when the writer flagged foreign endianness.
    pub is_little_endian: bool,
    pub has_subfiles: bool,
    pub format_version: FormatVersion,
    /// File is still being written.
    pub is_live: bool,
}

impl FormatHeader {
    /// Parse the header at the start of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::decode(&mut ByteCursor::new(data))
    }

    /// Parse the header at the cursor, consuming exactly 64 bytes.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let base = cursor.tell();
        let raw: [u8; HEADER_SIZE] = cursor.read_array()?;
        let at = |offset: usize| base + offset as u64;

        let version_bytes = &raw[..VERSION_STRING_LEN];
        let text_len = version_bytes.iter().position(|&b| b == 0).unwrap_or(VERSION_STRING_LEN);
        let version_string = String::from_utf8_lossy(&version_bytes[..text_len]).into_owned();

        let is_little_endian = match raw[ENDIAN_OFFSET] {
            0 => true,
            1 => false,
            value => {
                return Err(Error::InvalidFlagByte {
                    offset: at(ENDIAN_OFFSET),
                    field: "endianness",
                    value,
                })
            }
        };

        let format_version = FormatVersion::from_byte(raw[FORMAT_VERSION_OFFSET]).ok_or_else(|| {
            Error::UnsupportedVersion {
                offset: at(FORMAT_VERSION_OFFSET),
                value: raw[FORMAT_VERSION_OFFSET],
            }
        })?;

        let is_live = match LittleEndian::read_u64(&raw[IS_LIVE_OFFSET..]) {
            0 => false,
            1 => true,
            value => {
                return Err(Error::InvalidFlagValue {
                    offset: at(IS_LIVE_OFFSET),
                    field: "is live",
                    value,
                })
            }
        };

        let header = Self {
            version_string,
            major: version_digit(raw[MAJOR_OFFSET]),
            minor: version_digit(raw[MINOR_OFFSET]),
            micro: version_digit(raw[MICRO_OFFSET]),
            is_little_endian,
            has_subfiles: raw[SUBFILES_OFFSET] != 0,
            format_version,
            is_live,
        };
        debug!(
            version = %header.version_string,
            format = %header.format_version,
            live = header.is_live,
            "decoded header"
        );
        Ok(header)
    }

    /// Reject files whose body cannot be read as little-endian.
    pub fn ensure_native(&self) -> Result<()> {
        if !self.is_little_endian {
            return Err(Error::ForeignEndian { offset: ENDIAN_OFFSET as u64 });
        }
        Ok(())
    }

    /// Reject files of another format generation.
    pub fn ensure_version(&self, expected: FormatVersion) -> Result<()> {
        if self.format_version != expected {
            return Err(Error::UnsupportedVersion {
                offset: FORMAT_VERSION_OFFSET as u64,
                value: self.format_version.as_u8(),
            });
        }
        Ok(())
    }

    /// (major, minor, micro).
    #[inline]
    pub fn version(&self) -> (u8, u8, u8) {
        (self.major, self.minor, self.micro)
    }
}

/// Version components are written as ASCII digits; anything else is kept raw.
fn version_digit(b: u8) -> u8 {
    if b.is_ascii_digit() {
        b - b'0'
    } else {
        b
    }
}
