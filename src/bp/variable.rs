//! Variable metadata blocks.
//!
//! ```text
//! "[VMD" | length u64 | member id u32 | name | path | type u8
//!        | is-dimension 'y'/'n' | ndims u8 | dims length u16
//!        | ndims x (flag, u64) x 3 | characteristics
//!        | pad length u8 | pad ... "VMD]" | payload (data files)
//! ```

use tracing::{debug, trace, warn};

use super::characteristics::Characteristics;
use super::cursor::ByteCursor;
use super::format::*;
use super::options::DecodeOptions;
use crate::util::{
    BlockContext, BlockKind, DataType, DimensionTriple, DimensionValue, Dimensions, Error, Result,
};

/// Decoded variable block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableMetadata {
    /// Absolute offset of the opening tag.
    pub offset: u64,
    /// Value of the block length field.
    pub declared_length: u64,
    pub member_id: u32,
    pub name: String,
    pub path: String,
    pub data_type: DataType,
    pub is_dimension_variable: bool,
    pub dimensions: Dimensions,
    /// Value of the dimension-section length field.
    pub dimensions_length: u16,
    pub characteristics: Characteristics,
    /// Pad bytes written before the closing tag.
    pub end_tag_padding: u8,
    /// Payload location; present when decoding data files.
    pub payload: Option<ByteRange>,
}

impl VariableMetadata {
    /// Decode one variable block at the cursor.
    ///
    /// `cursor` must be bounded by the enclosing variables section; the block
    /// and its payload have to fit inside it. On success the cursor sits at
    /// the end of the block.
    pub fn decode(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> Result<Self> {
        let offset = cursor.tell();
        cursor.expect_tag(VMD_OPEN_TAG)?;
        let length_offset = cursor.tell();
        let declared_length = cursor.read_u64()?;
        let end = options
            .vmd_length
            .block_end(length_offset, declared_length)
            .ok_or_else(|| Error::Overflow {
                offset: length_offset,
                needed: declared_length,
                budget: cursor.remaining(),
            })?;
        let mut block = cursor.child_until(end, length_offset)?;

        let member_id = block.read_u32()?;
        let name = block.read_string16("variable name")?;
        let path = block.read_string16("variable path")?;
        let type_offset = block.tell();
        let data_type = DataType::from_id(block.read_u8()?);
        if !data_type.is_known() {
            debug!(offset = type_offset, id = data_type.id(), name = %name, "unknown variable type");
        }
        let is_dimension_variable = block.read_flag("is dimension variable")?;

        let ndims = block.read_u8()?;
        let dimensions_length = block.read_u16()?;
        let dimensions_size = ndims as u64 * DIMENSION_ENTRY_SIZE as u64;
        if dimensions_length as u64 != dimensions_size {
            warn!(
                offset = block.tell() - 2,
                declared = dimensions_length,
                ndims,
                "dimension length does not match dimension count"
            );
        }
        block.ensure(dimensions_size)?;
        let mut dimensions = Dimensions::scalar();
        for _ in 0..ndims {
            dimensions.push(DimensionTriple {
                local: read_dimension(&mut block)?,
                global: read_dimension(&mut block)?,
                offset: read_dimension(&mut block)?,
            });
        }

        let characteristics = Characteristics::decode(&mut block, data_type, options)
            .in_block(BlockKind::Characteristics, 0)?;
        let end_tag_padding = read_padded_end_tag(&mut block)?;

        let payload = if options.expect_payload {
            Some(locate_payload(&mut block, cursor.limit(), data_type, type_offset, &dimensions)?)
        } else {
            None
        };

        if !block.is_at_end() {
            return Err(Error::LengthMismatch {
                offset,
                declared: declared_length,
                consumed: block.tell() - length_offset,
            });
        }
        cursor.seek(end)?;

        trace!(offset, name = %name, ty = %data_type, dims = %dimensions, "variable");
        Ok(Self {
            offset,
            declared_length,
            member_id,
            name,
            path,
            data_type,
            is_dimension_variable,
            dimensions,
            dimensions_length,
            characteristics,
            end_tag_padding,
            payload,
        })
    }

    /// Product of the local extents (1 for a scalar).
    pub fn element_count(&self) -> Option<u64> {
        self.dimensions.element_count()
    }

    /// Payload size implied by the dimensions, for fixed-size types.
    pub fn expected_payload_size(&self) -> Option<u64> {
        match self.data_type.fixed_size() {
            0 => None,
            size => self.element_count()?.checked_mul(size as u64),
        }
    }

    /// `path/name`, or just the name when the path is empty.
    pub fn full_name(&self) -> String {
        join_path(&self.path, &self.name)
    }
}

pub(crate) fn join_path(path: &str, name: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{trimmed}/{name}")
    }
}

/// One (flag, value) dimension component; `'\0'` is written by old
/// producers and means a literal.
fn read_dimension(cursor: &mut ByteCursor<'_>) -> Result<DimensionValue> {
    let offset = cursor.tell();
    let flag = cursor.read_u8()?;
    let value = cursor.read_u64()?;
    match flag {
        FLAG_YES => Ok(DimensionValue::VariableReference(value)),
        FLAG_NO | 0 => Ok(DimensionValue::Literal(value)),
        value => Err(Error::InvalidFlagByte {
            offset,
            field: "dimension is variable reference",
            value,
        }),
    }
}

/// Length-prefixed closing tag whose last four bytes are `VMD]`.
fn read_padded_end_tag(cursor: &mut ByteCursor<'_>) -> Result<u8> {
    let len = cursor.read_u8()?;
    let start = cursor.tell();
    let bytes = cursor.read_bytes(len as usize)?;
    if !bytes.ends_with(VMD_CLOSE_TAG) {
        let tail = bytes.len().saturating_sub(TAG_SIZE);
        return Err(Error::TagMismatch {
            offset: start + tail as u64,
            expected: "VMD]",
            found: tag_display(&bytes[tail..]),
        });
    }
    Ok(len - TAG_SIZE as u8)
}

/// The rest of the block is payload; fixed-size types must match their
/// dimensions exactly. A size that would run past `section_end` is an
/// overflow rather than a mismatch.
fn locate_payload(
    block: &mut ByteCursor<'_>,
    section_end: u64,
    data_type: DataType,
    type_offset: u64,
    dimensions: &Dimensions,
) -> Result<ByteRange> {
    let offset = block.tell();
    let available = block.remaining();

    if !data_type.is_variable_length() {
        let size = data_type.fixed_size() as u64;
        if size == 0 {
            if available > 0 {
                return Err(Error::UnknownType { offset: type_offset, id: data_type.id() });
            }
        } else {
            let actual = dimensions
                .element_count()
                .and_then(|n| n.checked_mul(size))
                .unwrap_or(u64::MAX);
            if offset.checked_add(actual).map_or(true, |end| end > section_end) {
                return Err(Error::Overflow {
                    offset,
                    needed: actual,
                    budget: section_end.saturating_sub(offset),
                });
            }
            if actual != available {
                return Err(Error::PayloadSizeMismatch { offset, expected: available, actual });
            }
        }
    }

    block.skip(available)?;
    Ok(ByteRange::new(offset, available))
}
