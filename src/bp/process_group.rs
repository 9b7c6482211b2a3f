//! Process group blocks.
//!
//! One process group holds everything a single writer rank produced for one
//! output step:
//!
//! ```text
//! +------+--------+-----------+---------+----------+----------+------+
//! | [PGI | length | row-major | name    | reserved | timestep | step |
//! |      |  u64   |  'y'/'n'  | str16   |  4 bytes | str16    | u32  |
//! +------+--------+-----------+---------+----------+----------+------+
//! | methods: count u8, length u16, count x (id u8, params str16)      |
//! +--------------------------------------------------------------------+
//! | variables:  count u32, length u64, count x [VMD ... VMD] payload  |
//! +--------------------------------------------------------------------+
//! | attributes: count u32, length u64, count x [AMD ... AMD]          |
//! +--------------------------------------------------------------------+
//! | PGI]                                                               |
//! +--------------------------------------------------------------------+
//! ```
//!
//! The block length counts from the length field. Section lengths count the
//! bytes after their own length field.

use std::fmt;

use tracing::{debug, trace};

use super::attribute::AttributeMetadata;
use super::cursor::ByteCursor;
use super::format::*;
use super::options::DecodeOptions;
use super::variable::VariableMetadata;
use crate::util::{BlockContext, BlockKind, Error, Result};

/// Transport method id recorded by the writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportMethod {
    Mpi,
    Posix,
    Fstream,
    Stdio,
    Zmq,
    Null,
    Unknown(u8),
}

impl TransportMethod {
    pub const fn from_id(id: u8) -> Self {
        match id {
            0 => Self::Mpi,
            2 => Self::Posix,
            26 => Self::Fstream,
            27 => Self::Stdio,
            28 => Self::Zmq,
            255 => Self::Null,
            other => Self::Unknown(other),
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            Self::Mpi => 0,
            Self::Posix => 2,
            Self::Fstream => 26,
            Self::Stdio => 27,
            Self::Zmq => 28,
            Self::Null => 255,
            Self::Unknown(id) => id,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mpi => "MPI",
            Self::Posix => "POSIX",
            Self::Fstream => "FStream",
            Self::Stdio => "File-stdio",
            Self::Zmq => "ZMQ",
            Self::Null => "NULL",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown({id})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Method entry: id plus its parameter string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    pub method: TransportMethod,
    pub params: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessGroup {
    /// Absolute offset of the opening tag.
    pub offset: u64,
    pub declared_length: u64,
    pub is_row_major: bool,
    pub name: String,
    pub timestep_name: String,
    pub step: u32,
    pub methods: Vec<Method>,
    /// Bytes covered by the variable blocks, after the section length field.
    pub variables_section: ByteRange,
    pub variables: Vec<VariableMetadata>,
    pub attributes_section: ByteRange,
    pub attributes: Vec<AttributeMetadata>,
}

impl ProcessGroup {
    /// Decode one process group at the cursor.
    ///
    /// Errors from nested blocks carry a [`BlockKind::Variable`] or
    /// [`BlockKind::Attribute`] context; the caller adds the group's own.
    pub fn decode(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> Result<Self> {
        let offset = cursor.tell();
        cursor.expect_tag(PG_OPEN_TAG)?;
        let length_offset = cursor.tell();
        let declared_length = cursor.read_u64()?;
        let end = length_offset.checked_add(declared_length).ok_or_else(|| Error::Overflow {
            offset: length_offset,
            needed: declared_length,
            budget: cursor.remaining(),
        })?;
        let mut block = cursor.child_until(end, length_offset)?;

        let is_row_major = block.read_flag("row major")?;
        let name = block.read_string16("process group name")?;
        block.skip(4)?;
        let timestep_name = block.read_string16("timestep name")?;
        let step = block.read_u32()?;
        let methods = decode_methods(&mut block)?;

        let mut vars = Section::open(&mut block)?;
        let mut variables = Vec::with_capacity(vars.count.min(1024) as usize);
        for i in 0..vars.count {
            let var = VariableMetadata::decode(&mut vars.area, options)
                .in_block(BlockKind::Variable, i as u64)?;
            variables.push(var);
        }
        let variables_section = vars.close(&mut block)?;

        let mut attrs = Section::open(&mut block)?;
        let mut attributes = Vec::with_capacity(attrs.count.min(1024) as usize);
        for i in 0..attrs.count {
            let attr = AttributeMetadata::decode(&mut attrs.area).in_block(BlockKind::Attribute, i as u64)?;
            attributes.push(attr);
        }
        let attributes_section = attrs.close(&mut block)?;

        block.expect_tag(PG_CLOSE_TAG)?;
        if !block.is_at_end() {
            return Err(Error::LengthMismatch {
                offset,
                declared: declared_length,
                consumed: block.tell() - length_offset,
            });
        }
        cursor.seek(end)?;

        debug!(
            offset,
            name = %name,
            step,
            variables = variables.len(),
            attributes = attributes.len(),
            "process group"
        );
        Ok(Self {
            offset,
            declared_length,
            is_row_major,
            name,
            timestep_name,
            step,
            methods,
            variables_section,
            variables,
            attributes_section,
            attributes,
        })
    }

    /// Absolute offset one past the closing tag.
    pub fn end(&self) -> u64 {
        self.offset + TAG_SIZE as u64 + self.declared_length
    }

    pub fn variable(&self, name: &str) -> Option<&VariableMetadata> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

fn decode_methods(block: &mut ByteCursor<'_>) -> Result<Vec<Method>> {
    let count = block.read_u8()?;
    let length_offset = block.tell();
    let declared = block.read_u16()? as u64;
    let mut area = block.child(declared, length_offset)?;

    let mut methods = Vec::with_capacity(count as usize);
    for i in 0..count {
        let method = TransportMethod::from_id(area.read_u8().in_block(BlockKind::Methods, i as u64)?);
        let params = area
            .read_string16("method parameters")
            .in_block(BlockKind::Methods, i as u64)?;
        trace!(method = %method, params = %params, "method");
        methods.push(Method { method, params });
    }
    if !area.is_at_end() {
        return Err(Error::LengthMismatch {
            offset: length_offset,
            declared,
            consumed: area.tell() - length_offset - 2,
        });
    }
    block.seek(area.limit())?;
    Ok(methods)
}

/// Variables or attributes section: count u32, length u64, then blocks.
struct Section<'a> {
    /// Offset of the count field.
    start: u64,
    count: u32,
    range: ByteRange,
    area: ByteCursor<'a>,
}

impl<'a> Section<'a> {
    /// Overflow is reported at the count field, both here and in `close`.
    fn open(block: &mut ByteCursor<'a>) -> Result<Self> {
        let start = block.tell();
        let count = block.read_u32()?;
        let length = block.read_u64()?;
        let area = block.child(length, start)?;
        Ok(Self {
            start,
            count,
            range: ByteRange::new(area.tell(), length),
            area,
        })
    }

    /// Check that every declared byte was decoded and move past the section.
    ///
    /// A declared length larger than the blocks it holds claims bytes that
    /// belong to the next section.
    fn close(self, block: &mut ByteCursor<'a>) -> Result<ByteRange> {
        if !self.area.is_at_end() {
            return Err(Error::Overflow {
                offset: self.start,
                needed: self.range.length,
                budget: self.area.tell() - self.range.offset,
            });
        }
        block.seek(self.range.end())?;
        Ok(self.range)
    }
}
