//! Characteristics attached to a variable block.
//!
//! ```text
//! +-------+--------------+----------------------------------+
//! | count | length (u32) | entries: kind (u8) + payload ... |
//! +-------+--------------+----------------------------------+
//! ```
//!
//! Payload width depends on the kind and, for value/min/max, on the
//! variable's element type.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{trace, warn};

use super::cursor::ByteCursor;
use super::options::DecodeOptions;
use crate::util::{DataType, Error, Result};

/// Characteristic tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacteristicKind {
    Value,
    Min,
    Max,
    Offset,
    Dimensions,
    VarId,
    PayloadOffset,
    FileIndex,
    TimeIndex,
    Bitmap,
    Stat,
    TransformType,
    /// Tag outside the known set
    Unknown(u8),
}

impl CharacteristicKind {
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Value,
            1 => Self::Min,
            2 => Self::Max,
            3 => Self::Offset,
            4 => Self::Dimensions,
            5 => Self::VarId,
            6 => Self::PayloadOffset,
            7 => Self::FileIndex,
            8 => Self::TimeIndex,
            9 => Self::Bitmap,
            10 => Self::Stat,
            11 => Self::TransformType,
            other => Self::Unknown(other),
        }
    }

    pub const fn tag(self) -> u8 {
        match self {
            Self::Value => 0,
            Self::Min => 1,
            Self::Max => 2,
            Self::Offset => 3,
            Self::Dimensions => 4,
            Self::VarId => 5,
            Self::PayloadOffset => 6,
            Self::FileIndex => 7,
            Self::TimeIndex => 8,
            Self::Bitmap => 9,
            Self::Stat => 10,
            Self::TransformType => 11,
            Self::Unknown(tag) => tag,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Min => "min",
            Self::Max => "max",
            Self::Offset => "offset",
            Self::Dimensions => "dimensions",
            Self::VarId => "var_id",
            Self::PayloadOffset => "payload_offset",
            Self::FileIndex => "file_index",
            Self::TimeIndex => "time_index",
            Self::Bitmap => "bitmap",
            Self::Stat => "stat",
            Self::TransformType => "transform_type",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Payload bytes following the tag for a variable of type `data_type`.
    pub const fn payload_len(self, data_type: DataType) -> usize {
        match self {
            Self::Value | Self::Min | Self::Max => data_type.fixed_size(),
            Self::Offset | Self::PayloadOffset => 8,
            Self::FileIndex | Self::TimeIndex => 4,
            _ => 0,
        }
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(tag) => write!(f, "unknown({tag})"),
            other => f.write_str(other.name()),
        }
    }
}

/// One decoded characteristic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Characteristic {
    pub kind: CharacteristicKind,
    /// Absolute offset of the kind tag.
    pub offset: u64,
    pub raw: Vec<u8>,
}

impl Characteristic {
    /// Payload as u64 when it is exactly 8 bytes wide.
    pub fn as_u64(&self) -> Option<u64> {
        (self.raw.len() == 8).then(|| LittleEndian::read_u64(&self.raw))
    }

    /// Payload as u32 when it is exactly 4 bytes wide.
    pub fn as_u32(&self) -> Option<u32> {
        (self.raw.len() == 4).then(|| LittleEndian::read_u32(&self.raw))
    }
}

/// Decoded characteristics list of one variable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Characteristics {
    /// Byte length declared for the entry area.
    pub declared_length: u32,
    pub entries: Vec<Characteristic>,
    /// Declared bytes left over after the last entry.
    pub unparsed: u32,
}

impl Characteristics {
    /// Decode a list for a variable of type `data_type`.
    ///
    /// On return the cursor sits at the end of the declared entry area.
    pub fn decode(
        cursor: &mut ByteCursor<'_>,
        data_type: DataType,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let count = cursor.read_u8()?;
        let length_offset = cursor.tell();
        let declared_length = cursor.read_u32()?;
        let mut area = cursor.child(declared_length as u64, length_offset)?;

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let offset = area.tell();
            let kind = CharacteristicKind::from_tag(area.read_u8()?);
            if let CharacteristicKind::Unknown(tag) = kind {
                if !options.is_forensic() {
                    return Err(Error::UnknownCharacteristicKind { offset, tag });
                }
                warn!(offset, tag, "unknown characteristic kind, assuming empty payload");
            }
            let raw = area.read_bytes(kind.payload_len(data_type))?.to_vec();
            trace!(offset, kind = %kind, len = raw.len(), "characteristic");
            entries.push(Characteristic { kind, offset, raw });
        }

        let unparsed = area.remaining() as u32;
        if unparsed > 0 {
            trace!(unparsed, "skipping unparsed characteristic bytes");
        }
        cursor.seek(area.limit())?;

        Ok(Self { declared_length, entries, unparsed })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Characteristic> {
        self.entries.iter()
    }

    /// First entry of the given kind.
    pub fn get(&self, kind: CharacteristicKind) -> Option<&Characteristic> {
        self.entries.iter().find(|c| c.kind == kind)
    }

    pub fn offset(&self) -> Option<u64> {
        self.get(CharacteristicKind::Offset).and_then(Characteristic::as_u64)
    }

    pub fn payload_offset(&self) -> Option<u64> {
        self.get(CharacteristicKind::PayloadOffset).and_then(Characteristic::as_u64)
    }

    pub fn file_index(&self) -> Option<u32> {
        self.get(CharacteristicKind::FileIndex).and_then(Characteristic::as_u32)
    }

    pub fn time_index(&self) -> Option<u32> {
        self.get(CharacteristicKind::TimeIndex).and_then(Characteristic::as_u32)
    }
}
