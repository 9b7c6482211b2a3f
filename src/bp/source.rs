//! Byte sources for the decoders.
//!
//! Files are memory-mapped when the `mmap` feature is on, otherwise read into
//! an owned buffer. Either way the decoders see one contiguous `&[u8]`.

use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};

#[cfg(feature = "mmap")]
use memmap2::Mmap;
use tracing::debug;

use crate::util::{Error, Result};

enum SourceInner {
    /// Memory-mapped file
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    /// Owned buffer (read fallback, empty files, tests)
    Buffer(Vec<u8>),
}

/// Immutable bytes of one file.
pub struct FileSource {
    inner: SourceInner,
    path: Option<PathBuf>,
}

impl FileSource {
    /// Open a file, memory-mapped when available.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, cfg!(feature = "mmap"))
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();

        // Zero-length files cannot be mapped on every platform.
        let inner = match (use_mmap, size) {
            #[cfg(feature = "mmap")]
            (true, 1..) => {
                // Safety: the map is read-only; concurrent truncation by another
                // process is outside what a decoder can guard against.
                let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
                SourceInner::Mmap(mmap)
            }
            _ => {
                let mut buf = Vec::with_capacity(size as usize);
                file.read_to_end(&mut buf)?;
                SourceInner::Buffer(buf)
            }
        };

        let source = Self { inner, path: Some(path.to_path_buf()) };
        debug!(path = %path.display(), size, mapped = source.is_mapped(), "opened");
        Ok(source)
    }

    /// Wrap bytes that are already in memory.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { inner: SourceInner::Buffer(bytes), path: None }
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.inner {
            #[cfg(feature = "mmap")]
            SourceInner::Mmap(mmap) => &mmap[..],
            SourceInner::Buffer(buf) => &buf[..],
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn is_mapped(&self) -> bool {
        match &self.inner {
            #[cfg(feature = "mmap")]
            SourceInner::Mmap(_) => true,
            SourceInner::Buffer(_) => false,
        }
    }

    /// Path the source was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Deref for FileSource {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
