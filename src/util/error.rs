//! Error types for the BP decoder.
//!
//! Every low-level variant carries the absolute byte offset at which the
//! problem was detected. Decoders wrap errors in [`Error::InBlock`] on the way
//! out so the caller sees which process group / variable / record failed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of on-disk block an error can be attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Header,
    ProcessGroup,
    Methods,
    VariableSection,
    Variable,
    Characteristics,
    AttributeSection,
    Attribute,
    IndexRow,
    IndexRecord,
}

impl BlockKind {
    /// Human readable name used in error messages and dumps.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::ProcessGroup => "process group",
            Self::Methods => "methods",
            Self::VariableSection => "variables section",
            Self::Variable => "variable",
            Self::Characteristics => "characteristics",
            Self::AttributeSection => "attributes section",
            Self::Attribute => "attribute",
            Self::IndexRow => "index row",
            Self::IndexRecord => "index record",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of an enclosing block: its kind and index within the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub kind: BlockKind,
    pub index: u64,
}

impl BlockId {
    #[inline]
    pub const fn new(kind: BlockKind, index: u64) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.index)
    }
}

/// Main error type for BP decoding.
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer bytes remain in the buffer than a read requires
    #[error("Truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncation { offset: u64, needed: u64, available: u64 },

    /// Opening or closing literal tag does not match
    #[error("Tag mismatch at offset {offset}: expected {expected:?}, found {found:?}")]
    TagMismatch {
        offset: u64,
        expected: &'static str,
        found: String,
    },

    /// A declared length reaches past the budget of the enclosing block
    #[error("Overflow at offset {offset}: {needed} bytes declared but only {budget} remain in the enclosing block")]
    Overflow { offset: u64, needed: u64, budget: u64 },

    /// A block was decoded completely but did not consume its declared length
    #[error("Length mismatch for block at offset {offset}: declared {declared} bytes, decoded {consumed}")]
    LengthMismatch { offset: u64, declared: u64, consumed: u64 },

    /// Type id outside the catalog where a size is required
    #[error("Unknown type id {id} at offset {offset}")]
    UnknownType { offset: u64, id: u8 },

    /// Characteristic tag outside the known set
    #[error("Unknown characteristic kind {tag} at offset {offset}")]
    UnknownCharacteristicKind { offset: u64, tag: u8 },

    /// Index record tag outside the known set
    #[error("Unknown index record kind 0x{tag:02x} at offset {offset}")]
    UnknownRecordKind { offset: u64, tag: u8 },

    /// A boolean-coded byte is not one of its literal values
    #[error("Invalid {field} flag byte 0x{value:02x} at offset {offset}")]
    InvalidFlagByte {
        offset: u64,
        field: &'static str,
        value: u8,
    },

    /// A boolean-coded integer is neither 0 nor 1
    #[error("Invalid {field} flag value {value} at offset {offset}")]
    InvalidFlagValue {
        offset: u64,
        field: &'static str,
        value: u64,
    },

    /// Payload bytes left in a variable block disagree with its dimensions
    #[error("Payload size mismatch at offset {offset}: block holds {expected} bytes, dimensions give {actual}")]
    PayloadSizeMismatch { offset: u64, expected: u64, actual: u64 },

    /// v5 step record seen before any writer map record
    #[error("Step record at offset {offset} appears before any writer map record")]
    MissingWriterMap { offset: u64 },

    /// Header reports the file was written with foreign endianness
    #[error("File uses foreign endianness (flag at offset {offset}); byte swapping is not supported")]
    ForeignEndian { offset: u64 },

    /// Header format generation is neither 4 nor 5
    #[error("Unsupported BP format generation {value} at offset {offset}")]
    UnsupportedVersion { offset: u64, value: u8 },

    /// Name or path bytes are not valid UTF-8
    #[error("Invalid UTF-8 in {field} at offset {offset}")]
    InvalidUtf8 { offset: u64, field: &'static str },

    /// Error raised while decoding a nested block
    #[error("In {block}: {source}")]
    InBlock {
        block: BlockId,
        #[source]
        source: Box<Error>,
    },

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attribute this error to an enclosing block.
    pub fn in_block(self, kind: BlockKind, index: u64) -> Self {
        Self::InBlock {
            block: BlockId::new(kind, index),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all block context removed.
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Self::InBlock { source, .. } = err {
            err = source;
        }
        err
    }

    /// Enclosing blocks, outermost first.
    pub fn block_path(&self) -> Vec<BlockId> {
        let mut path = Vec::new();
        let mut err = self;
        while let Self::InBlock { block, source } = err {
            path.push(*block);
            err = source;
        }
        path
    }

    /// Byte offset of the innermost error, if it has one.
    pub fn offset(&self) -> Option<u64> {
        match self.root() {
            Self::Truncation { offset, .. }
            | Self::TagMismatch { offset, .. }
            | Self::Overflow { offset, .. }
            | Self::LengthMismatch { offset, .. }
            | Self::UnknownType { offset, .. }
            | Self::UnknownCharacteristicKind { offset, .. }
            | Self::UnknownRecordKind { offset, .. }
            | Self::InvalidFlagByte { offset, .. }
            | Self::InvalidFlagValue { offset, .. }
            | Self::PayloadSizeMismatch { offset, .. }
            | Self::MissingWriterMap { offset }
            | Self::ForeignEndian { offset }
            | Self::UnsupportedVersion { offset, .. }
            | Self::InvalidUtf8 { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// True if the innermost error is a truncation.
    pub fn is_truncation(&self) -> bool {
        matches!(self.root(), Self::Truncation { .. })
    }
}

/// Attach block context to a `Result`.
pub trait BlockContext<T> {
    fn in_block(self, kind: BlockKind, index: u64) -> Result<T>;
}

impl<T> BlockContext<T> for Result<T> {
    #[inline]
    fn in_block(self, kind: BlockKind, index: u64) -> Result<T> {
        self.map_err(|e| e.in_block(kind, index))
    }
}

/// Result type alias for BP decoding.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::Truncation { offset: 12, needed: 8, available: 3 };
        let s = e.to_string();
        assert!(s.contains("12"));
        assert!(s.contains("8"));

        let e = Error::MissingWriterMap { offset: 64 };
        assert!(e.to_string().contains("writer map"));
    }

    #[test]
    fn test_block_context() {
        let inner = Error::TagMismatch { offset: 99, expected: "VMD]", found: "VMX]".into() };
        let err = inner
            .in_block(BlockKind::Variable, 3)
            .in_block(BlockKind::ProcessGroup, 1);

        assert_eq!(err.offset(), Some(99));
        assert!(matches!(err.root(), Error::TagMismatch { .. }));
        assert_eq!(
            err.block_path(),
            vec![
                BlockId::new(BlockKind::ProcessGroup, 1),
                BlockId::new(BlockKind::Variable, 3),
            ]
        );
        let s = err.to_string();
        assert!(s.starts_with("In process group #1"));
        assert!(s.contains("variable #3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.offset(), None);
    }
}
