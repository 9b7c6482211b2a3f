//! Variable dimensions.
//!
//! Each dimension of a BP variable is a (local, global, offset) triple. Any
//! component can be a literal value or a reference to another variable that
//! supplies the value at run time.

use smallvec::SmallVec;
use std::fmt;

/// One component of a dimension triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimensionValue {
    /// Value stored directly in the file.
    Literal(u64),
    /// Id of the variable holding the value.
    VariableReference(u64),
}

impl DimensionValue {
    /// The stored 8-byte value, regardless of interpretation.
    #[inline]
    pub const fn raw(self) -> u64 {
        match self {
            Self::Literal(v) | Self::VariableReference(v) => v,
        }
    }

    #[inline]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::VariableReference(_))
    }

    /// The literal value, if this is not a reference.
    #[inline]
    pub const fn literal(self) -> Option<u64> {
        match self {
            Self::Literal(v) => Some(v),
            Self::VariableReference(_) => None,
        }
    }
}

impl Default for DimensionValue {
    fn default() -> Self {
        Self::Literal(0)
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::VariableReference(id) => write!(f, "var#{id}"),
        }
    }
}

/// Local, global and offset components of one dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DimensionTriple {
    pub local: DimensionValue,
    pub global: DimensionValue,
    pub offset: DimensionValue,
}

impl DimensionTriple {
    /// Triple with all three components literal.
    pub const fn literal(local: u64, global: u64, offset: u64) -> Self {
        Self {
            local: DimensionValue::Literal(local),
            global: DimensionValue::Literal(global),
            offset: DimensionValue::Literal(offset),
        }
    }
}

/// Dimensions of a variable, in file order.
///
/// Empty means scalar (one element).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    dims: SmallVec<[DimensionTriple; 4]>,
}

impl Dimensions {
    /// Scalar dimensions (rank 0).
    pub fn scalar() -> Self {
        Self { dims: SmallVec::new() }
    }

    /// Create from a slice of triples.
    pub fn from_slice(dims: &[DimensionTriple]) -> Self {
        Self { dims: SmallVec::from_slice(dims) }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn get(&self, dim: usize) -> Option<&DimensionTriple> {
        self.dims.get(dim)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionTriple> {
        self.dims.iter()
    }

    pub fn push(&mut self, dim: DimensionTriple) {
        self.dims.push(dim);
    }

    /// Raw local extents.
    pub fn local_sizes(&self) -> SmallVec<[u64; 4]> {
        self.dims.iter().map(|d| d.local.raw()).collect()
    }

    /// Number of elements: product of the raw local extents.
    ///
    /// Returns `None` when the product does not fit in a `u64`.
    pub fn element_count(&self) -> Option<u64> {
        self.dims
            .iter()
            .try_fold(1u64, |acc, d| acc.checked_mul(d.local.raw()))
    }

    /// True if any component refers to another variable.
    pub fn has_references(&self) -> bool {
        self.dims.iter().any(|d| {
            d.local.is_reference() || d.global.is_reference() || d.offset.is_reference()
        })
    }
}

impl From<Vec<DimensionTriple>> for Dimensions {
    fn from(v: Vec<DimensionTriple>) -> Self {
        Self { dims: SmallVec::from_vec(v) }
    }
}

impl<'a> IntoIterator for &'a Dimensions {
    type Item = &'a DimensionTriple;
    type IntoIter = std::slice::Iter<'a, DimensionTriple>;

    fn into_iter(self) -> Self::IntoIter {
        self.dims.iter()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d.local)?;
        }
        write!(f, "]")
    }
}
