//! Type catalog - on-disk type ids of the BP format.

use std::fmt;

/// Element type of a variable or attribute, keyed by its on-disk id.
///
/// Ids follow the BP data type table. Fixed sizes are in bytes; a size of 0
/// marks a variable-length encoding (strings). Ids outside the table decode
/// to [`DataType::Unknown`] carrying the raw id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Byte,
    Short,
    Integer,
    Long,
    Real,
    Double,
    LongDouble,
    String,
    Complex,
    DoubleComplex,
    StringArray,
    LongDoubleComplex,
    UnsignedByte,
    UnsignedShort,
    UnsignedInteger,
    UnsignedLong,
    /// Id not present in the catalog
    Unknown(u8),
}

/// Flat description of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: u8,
    pub name: &'static str,
    pub fixed_size: usize,
}

impl DataType {
    /// Every known catalog entry.
    pub const ALL: [DataType; 16] = [
        Self::Byte,
        Self::Short,
        Self::Integer,
        Self::Long,
        Self::Real,
        Self::Double,
        Self::LongDouble,
        Self::String,
        Self::Complex,
        Self::DoubleComplex,
        Self::StringArray,
        Self::LongDoubleComplex,
        Self::UnsignedByte,
        Self::UnsignedShort,
        Self::UnsignedInteger,
        Self::UnsignedLong,
    ];

    /// Resolve an on-disk type id.
    pub const fn from_id(id: u8) -> Self {
        match id {
            0 => Self::Byte,
            1 => Self::Short,
            2 => Self::Integer,
            4 => Self::Long,
            5 => Self::Real,
            6 => Self::Double,
            7 => Self::LongDouble,
            9 => Self::String,
            10 => Self::Complex,
            11 => Self::DoubleComplex,
            12 => Self::StringArray,
            13 => Self::LongDoubleComplex,
            50 => Self::UnsignedByte,
            51 => Self::UnsignedShort,
            52 => Self::UnsignedInteger,
            54 => Self::UnsignedLong,
            other => Self::Unknown(other),
        }
    }

    /// The on-disk id.
    pub const fn id(self) -> u8 {
        match self {
            Self::Byte => 0,
            Self::Short => 1,
            Self::Integer => 2,
            Self::Long => 4,
            Self::Real => 5,
            Self::Double => 6,
            Self::LongDouble => 7,
            Self::String => 9,
            Self::Complex => 10,
            Self::DoubleComplex => 11,
            Self::StringArray => 12,
            Self::LongDoubleComplex => 13,
            Self::UnsignedByte => 50,
            Self::UnsignedShort => 51,
            Self::UnsignedInteger => 52,
            Self::UnsignedLong => 54,
            Self::Unknown(id) => id,
        }
    }

    /// Returns the name of this type as a string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Real => "real",
            Self::Double => "double",
            Self::LongDouble => "long_double",
            Self::String => "string",
            Self::Complex => "complex",
            Self::DoubleComplex => "double_complex",
            Self::StringArray => "string_array",
            Self::LongDoubleComplex => "long_double_complex",
            Self::UnsignedByte => "unsigned_byte",
            Self::UnsignedShort => "unsigned_short",
            Self::UnsignedInteger => "unsigned_integer",
            Self::UnsignedLong => "unsigned_long",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Size in bytes of one element; 0 for variable-length and unknown types.
    pub const fn fixed_size(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Integer | Self::UnsignedInteger | Self::Real => 4,
            Self::Long | Self::UnsignedLong | Self::Double | Self::Complex => 8,
            Self::LongDouble | Self::DoubleComplex => 16,
            Self::LongDoubleComplex => 32,
            Self::String | Self::StringArray | Self::Unknown(_) => 0,
        }
    }

    /// True for string types whose values carry their own length.
    #[inline]
    pub const fn is_variable_length(self) -> bool {
        matches!(self, Self::String | Self::StringArray)
    }

    /// True if the id was found in the catalog.
    #[inline]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub const fn descriptor(self) -> TypeDescriptor {
        TypeDescriptor {
            id: self.id(),
            name: self.name(),
            fixed_size: self.fixed_size(),
        }
    }
}

impl From<u8> for DataType {
    #[inline]
    fn from(id: u8) -> Self {
        Self::from_id(id)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown({id})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        assert_eq!(DataType::Byte.fixed_size(), 1);
        assert_eq!(DataType::UnsignedShort.fixed_size(), 2);
        assert_eq!(DataType::Real.fixed_size(), 4);
        assert_eq!(DataType::Double.fixed_size(), 8);
        assert_eq!(DataType::LongDouble.fixed_size(), 16);
        assert_eq!(DataType::String.fixed_size(), 0);
    }

    #[test]
    fn test_id_roundtrip() {
        for ty in DataType::ALL {
            assert_eq!(DataType::from_id(ty.id()), ty);
            assert!(ty.is_known());
        }
    }

    #[test]
    fn test_unknown_ids() {
        for id in [3u8, 8, 14, 49, 53, 55, 255] {
            let ty = DataType::from_id(id);
            assert_eq!(ty, DataType::Unknown(id));
            assert_eq!(ty.fixed_size(), 0);
            assert_eq!(ty.name(), "unknown");
            assert_eq!(ty.id(), id);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::UnsignedLong.to_string(), "unsigned_long");
        assert_eq!(DataType::Unknown(99).to_string(), "unknown(99)");
    }
}
