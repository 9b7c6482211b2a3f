//! Presentation of decoded structures.
//!
//! - [`text`] - field-per-line reports, one block after another
//! - [`json`] - `serde_json` values for machine consumption
//!
//! Nothing here reads bytes; every function takes an already decoded value.

pub mod json;
pub mod text;

pub use json::*;
pub use text::*;
