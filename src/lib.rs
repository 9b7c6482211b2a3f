//! # bpformat
//!
//! Decoder for the BP self-describing array storage format written by
//! parallel scientific I/O libraries.
//!
//! Given the bytes of an index file or a data file, the decoder reconstructs
//! process groups, variables, attributes, characteristics and step indexing
//! with exact byte offsets. Payloads are located, never interpreted.
//!
//! ## Modules
//!
//! - [`util`] - Type catalog, dimensions, errors
//! - [`bp`] - Header, block and index decoders, data file scanning, datasets
//! - [`dump`] - Text and JSON reports of decoded structures
//!
//! ## Example
//!
//! ```ignore
//! use bpformat::prelude::*;
//!
//! let source = FileSource::open("run.bp/data.0")?;
//! let report = DataFileDecoder::new(DecodeOptions::forensic()).decode(&source)?;
//!
//! for pg in &report.process_groups {
//!     println!("step {}: {} variables", pg.step, pg.variables.len());
//! }
//! ```

pub mod bp;
pub mod dump;
pub mod util;

// Re-export commonly used types
pub use util::{DataType, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bp::{
        AttributeMetadata, DataFileDecoder, DataFileReport, Dataset, DecodeMode, DecodeOptions,
        FileSource, FormatHeader, FormatVersion, Index, IndexV4, IndexV5, ProcessGroup,
        VariableMetadata, VmdLengthConvention,
    };
    pub use crate::util::{DataType, DimensionValue, Dimensions, Error, Result};
}
