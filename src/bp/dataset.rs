//! BP dataset directories.
//!
//! ```text
//! name.bp/
//!   md.idx      index (v4 rows or v5 records)
//!   md.0 ...    metadata
//!   mmd.0       meta-metadata (v5)
//!   data.0 ...  data subfiles
//! ```

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, info};

use super::cursor::ByteCursor;
use super::data_file::{DataFileDecoder, DataFileReport};
use super::header::{FormatHeader, FormatVersion};
use super::index_v4::IndexV4;
use super::index_v5::IndexV5;
use super::options::DecodeOptions;
use super::source::FileSource;
use crate::util::{BlockContext, BlockKind, Error, Result};

pub const INDEX_FILE_NAME: &str = "md.idx";

/// Decoded index of either generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Index {
    V4(IndexV4),
    V5(IndexV5),
}

impl Index {
    /// Decode an index file, choosing the generation from its header.
    pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let header = FormatHeader::decode(&mut cursor).in_block(BlockKind::Header, 0)?;
        header.ensure_native()?;
        match header.format_version {
            FormatVersion::V4 => Ok(Self::V4(IndexV4::decode_rows(header, &mut cursor)?)),
            FormatVersion::V5 => Ok(Self::V5(IndexV5::decode_records(header, &mut cursor, options)?)),
        }
    }

    pub fn header(&self) -> &FormatHeader {
        match self {
            Self::V4(idx) => &idx.header,
            Self::V5(idx) => &idx.header,
        }
    }

    pub fn format_version(&self) -> FormatVersion {
        self.header().format_version
    }

    /// Number of output steps the index describes.
    pub fn step_count(&self) -> usize {
        match self {
            Self::V4(idx) => idx.steps().len(),
            Self::V5(idx) => idx.steps().count(),
        }
    }
}

/// One `data.N` subfile.
#[derive(Debug)]
pub struct DataFileEntry {
    pub id: u32,
    pub path: PathBuf,
    pub size: u64,
    /// Decoded process groups; v5 data files carry no group framing and are
    /// only listed.
    pub report: Option<DataFileReport>,
}

#[derive(Debug)]
pub struct Dataset {
    pub root: PathBuf,
    pub index: Index,
    /// `md.N` files in numeric order.
    pub metadata_files: Vec<PathBuf>,
    /// `mmd.N` files in numeric order.
    pub meta_metadata_files: Vec<PathBuf>,
    pub data_files: Vec<DataFileEntry>,
}

impl Dataset {
    /// Open a dataset directory, decode its index and (for v4) every data file.
    ///
    /// Data files are decoded in parallel. In strict mode the first failing
    /// file fails the whole dataset.
    pub fn open(root: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
        let root = root.as_ref();
        let index_path = root.join(INDEX_FILE_NAME);
        let index_source = FileSource::open(&index_path)?;
        let index = Index::decode(&index_source, options)?;
        info!(
            path = %root.display(),
            format = %index.format_version(),
            steps = index.step_count(),
            "opened dataset"
        );

        let metadata_files = numbered_files(root, "md")?.into_iter().map(|(_, p)| p).collect();
        let meta_metadata_files = numbered_files(root, "mmd")?.into_iter().map(|(_, p)| p).collect();

        let decode_groups = index.format_version() == FormatVersion::V4;
        let decoder = DataFileDecoder::new(*options);
        let data_files = numbered_files(root, "data")?
            .into_par_iter()
            .map(|(id, path)| -> Result<DataFileEntry> {
                let source = FileSource::open(&path)?;
                let report = if decode_groups {
                    let report = decoder.decode(&source).map_err(|e| {
                        error!(path = %path.display(), error = %e, "data file failed to decode");
                        e
                    })?;
                    debug!(path = %path.display(), groups = report.process_groups.len(), "decoded data file");
                    Some(report)
                } else {
                    None
                };
                Ok(DataFileEntry { id, size: source.len(), path, report })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root: root.to_path_buf(),
            index,
            metadata_files,
            meta_metadata_files,
            data_files,
        })
    }

    pub fn format_version(&self) -> FormatVersion {
        self.index.format_version()
    }

    /// Errors recorded across all data files (forensic mode).
    pub fn errors(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.data_files.iter().flat_map(|f| {
            f.report
                .iter()
                .flat_map(|r| r.errors.iter())
                .map(move |e| (f.path.as_path(), e))
        })
    }
}

/// Files named `<prefix>.<N>` in `dir`, sorted by N.
fn numbered_files(dir: &Path, prefix: &str) -> Result<Vec<(u32, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|n| n.strip_prefix(prefix))
            .and_then(|n| n.strip_prefix('.'))
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        if entry.file_type()?.is_file() {
            files.push((id, entry.path()));
        }
    }
    files.sort_unstable_by_key(|(id, _)| *id);
    Ok(files)
}
