//! Utility types shared by every decoder.
//!
//! - [`DataType`] - the on-disk type catalog
//! - [`Dimensions`] - per-variable dimension triples
//! - [`Error`] / [`Result`] - error handling with byte offsets

mod data_type;
mod dimensions;
mod error;

pub use data_type::*;
pub use dimensions::*;
pub use error::*;
