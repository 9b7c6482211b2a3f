//! Attribute metadata blocks.
//!
//! ```text
//! "[AMD" | length u64 | member id u32 | name | path | type u8 | value ... | "AMD]"
//! ```
//!
//! The closing tag is the last four bytes of the declared block; whatever sits
//! between the type byte and the tag is reported as an opaque value range.

use tracing::trace;

use super::cursor::ByteCursor;
use super::format::*;
use super::variable::join_path;
use crate::util::{DataType, Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeMetadata {
    /// Absolute offset of the opening tag.
    pub offset: u64,
    pub declared_length: u64,
    pub member_id: u32,
    pub name: String,
    pub path: String,
    pub data_type: DataType,
    /// Bytes between the type byte and the closing tag, if any.
    pub value: Option<ByteRange>,
}

impl AttributeMetadata {
    /// Decode one attribute block; the cursor ends at the block end.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cursor.tell();
        cursor.expect_tag(AMD_OPEN_TAG)?;
        let length_offset = cursor.tell();
        let declared_length = cursor.read_u64()?;
        let end = length_offset.checked_add(declared_length).ok_or_else(|| Error::Overflow {
            offset: length_offset,
            needed: declared_length,
            budget: cursor.remaining(),
        })?;
        let mut block = cursor.child_until(end, length_offset)?;

        // Smallest block: length field, member id, two empty strings, type, tag.
        let minimum = 8 + 4 + 2 + 2 + 1 + TAG_SIZE as u64;
        if declared_length < minimum {
            return Err(Error::LengthMismatch {
                offset,
                declared: declared_length,
                consumed: minimum,
            });
        }
        let mut body = block.child_until(end - TAG_SIZE as u64, length_offset)?;

        let member_id = body.read_u32()?;
        let name = body.read_string16("attribute name")?;
        let path = body.read_string16("attribute path")?;
        let data_type = DataType::from_id(body.read_u8()?);
        let value = (!body.is_at_end()).then(|| ByteRange::new(body.tell(), body.remaining()));

        block.seek(end - TAG_SIZE as u64)?;
        block.expect_tag(AMD_CLOSE_TAG)?;
        cursor.seek(end)?;

        trace!(offset, name = %name, ty = %data_type, "attribute");
        Ok(Self {
            offset,
            declared_length,
            member_id,
            name,
            path,
            data_type,
            value,
        })
    }

    pub fn full_name(&self) -> String {
        join_path(&self.path, &self.name)
    }
}
