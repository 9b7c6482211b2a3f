//! Low-level BP binary format decoding.
//!
//! Every file starts with the same 64-byte header; what follows depends on
//! the file kind and the format generation.
//!
//! ## Header
//!
//! ```text
//! +---------------------------+
//! | Version string            |  24 bytes, NUL padded
//! +---------------------------+
//! | Major / minor / micro     |  3 bytes (ASCII digits)
//! +---------------------------+
//! | (reserved)                |  1 byte
//! +---------------------------+
//! | Endianness                |  1 byte (0 = little-endian)
//! +---------------------------+
//! | (reserved)                |  1 byte
//! +---------------------------+
//! | Has subfiles              |  1 byte
//! +---------------------------+
//! | Format generation         |  1 byte (4 or 5)
//! +---------------------------+
//! | (reserved)                |  24 bytes
//! +---------------------------+
//! | Is live                   |  8 bytes (u64 LE, 0 or 1)
//! +---------------------------+
//! ```
//!
//! ## Data files
//!
//! ```text
//! [header] [PGI ... PGI] [PGI ... PGI] ... [zero padding]
//! ```
//!
//! Each process group nests variable (`[VMD`) and attribute (`[AMD`) blocks.
//! Every block declares its length up front and must fit inside its parent.

mod attribute;
mod characteristics;
mod cursor;
mod data_file;
mod dataset;
mod format;
mod header;
mod index_v4;
mod index_v5;
mod options;
mod process_group;
mod source;
mod variable;

#[cfg(test)]
mod testutil;

pub use attribute::*;
pub use characteristics::*;
pub use cursor::*;
pub use data_file::*;
pub use dataset::*;
pub use format::*;
pub use header::*;
pub use index_v4::*;
pub use index_v5::*;
pub use options::*;
pub use process_group::*;
pub use source::*;
pub use variable::*;
