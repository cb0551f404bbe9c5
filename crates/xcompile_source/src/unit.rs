//! The input handed to a compiler: a canonical path plus its raw bytes.

use std::borrow::Cow;
use std::path::Path;

use xcompile_common::{mime_for_path, ContentHash, MimeType};

use crate::canonical::CanonicalPath;
use crate::error::SourceError;

/// A source file read fresh for a single compile request.
///
/// Never mutated after loading; dropped once fingerprinted and compiled.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// The canonical identity of the file.
    pub path: CanonicalPath,
    /// The raw file content.
    pub bytes: Vec<u8>,
}

impl CompilationUnit {
    /// Reads the file at `path`.
    ///
    /// A file that vanished since it was listed yields
    /// [`SourceError::NotFound`] rather than a generic I/O error.
    pub fn load(path: CanonicalPath) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path.as_path()).map_err(|e| SourceError::from_io(path.as_path(), e))?;
        Ok(Self { path, bytes })
    }

    /// Builds a unit from in-memory content (useful for tests and for
    /// compilers that synthesize sub-units, such as inline blocks).
    pub fn from_source(path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: CanonicalPath::from_resolved(path.as_ref()),
            bytes: content.into(),
        }
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// The XXH3 hash of the raw bytes.
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::from_bytes(&self.bytes)
    }

    /// MIME type inferred from the file extension.
    pub fn mime_type(&self) -> Option<MimeType> {
        mime_for_path(self.path.as_path())
    }
}
