//! Fingerprint-addressed artifact storage.
//!
//! Each compiled artifact lives at `<cache_dir>/artifacts/<fingerprint>.art`
//! as a length-prefixed binary header followed by the compiled code. The
//! header carries magic bytes, a format version, the output metadata, and a
//! checksum of the code so that truncated or foreign files read as misses.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xcompile_common::{ContentHash, Fingerprint, MimeType};
use xcompile_compiler::CompiledArtifact;

use crate::error::CacheError;
use crate::fsutil::write_atomic;

/// Magic bytes identifying an xcompile artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"XCMP";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Subdirectory of the cache directory holding artifacts.
pub const ARTIFACT_DIR: &str = "artifacts";

/// File extension of artifact files.
pub const ARTIFACT_EXT: &str = "art";

/// Header prepended to every stored artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"XCMP"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// MIME type of the compiled code.
    pub mime_type: MimeType,

    /// Source map emitted by the compiler, if any.
    pub source_map: Option<String>,

    /// Files the compiler reported reading besides the unit itself.
    pub dependencies: Vec<String>,

    /// Content hash of the payload for integrity checks.
    pub checksum: ContentHash,
}

/// On-disk store of compiled artifacts keyed by fingerprint.
///
/// Artifacts are written once per fingerprint and never modified; a second
/// write for a fingerprint that already has a file is skipped.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store under the given cache directory. Nothing is created
    /// on disk until the first write.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join(ARTIFACT_DIR),
        }
    }

    /// The directory holding artifact files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path for the artifact with the given fingerprint.
    pub fn artifact_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.{ARTIFACT_EXT}"))
    }

    /// Returns `true` if an artifact file exists for `fingerprint`.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.artifact_path(fingerprint).is_file()
    }

    /// Writes an artifact and returns the path it was stored at.
    ///
    /// A valid artifact already stored under `fingerprint` is kept. An
    /// invalid one is replaced.
    pub fn write(&self, fingerprint: &Fingerprint, artifact: &CompiledArtifact) -> Result<PathBuf, CacheError> {
        let path = self.artifact_path(fingerprint);
        match self.read_validated(fingerprint) {
            Ok(Some(_)) => return Ok(path),
            Ok(None) => {}
            Err(e) => tracing::debug!(%fingerprint, error = %e, "replacing invalid artifact"),
        }

        let payload = artifact.code.as_bytes();
        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            mime_type: artifact.mime_type.clone(),
            source_map: artifact.source_map.clone(),
            dependencies: artifact.dependencies.clone(),
            checksum: ContentHash::from_bytes(payload),
        };

        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(payload);

        write_atomic(&path, &output)?;
        tracing::trace!(%fingerprint, bytes = output.len(), "artifact written");
        Ok(path)
    }

    /// Reads and validates an artifact.
    ///
    /// Returns `Ok(None)` when no file exists and an error describing the
    /// problem when a file exists but cannot be trusted.
    pub fn read_validated(&self, fingerprint: &Fingerprint) -> Result<Option<CompiledArtifact>, CacheError> {
        let path = self.artifact_path(fingerprint);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        decode(&path, &raw).map(Some)
    }

    /// Reads an artifact, treating any invalid file as a miss.
    pub fn read(&self, fingerprint: &Fingerprint) -> Option<CompiledArtifact> {
        match self.read_validated(fingerprint) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%fingerprint, error = %e, "discarding unreadable artifact");
                None
            }
        }
    }

    /// Lists the fingerprints of all stored artifacts.
    pub fn fingerprints(&self) -> Result<Vec<Fingerprint>, CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            if let Some(fingerprint) = parse_artifact_name(&entry.path()) {
                found.push(fingerprint);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Deletes every artifact whose fingerprint is not in `live`.
    ///
    /// Returns the number of files removed. Files in the artifact directory
    /// that are not artifacts are left alone.
    pub fn prune(&self, live: &HashSet<Fingerprint>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for fingerprint in self.fingerprints()? {
            if live.contains(&fingerprint) {
                continue;
            }
            let path = self.artifact_path(&fingerprint);
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(path, e)),
            }
        }
        Ok(removed)
    }
}

fn parse_artifact_name(path: &Path) -> Option<Fingerprint> {
    if path.extension()? != ARTIFACT_EXT {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

fn decode(path: &Path, raw: &[u8]) -> Result<CompiledArtifact, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("file too short"));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&raw[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (ArtifactHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != ARTIFACT_MAGIC {
        return Err(invalid("bad magic"));
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: ARTIFACT_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let code = String::from_utf8(payload.to_vec()).map_err(|_| invalid("payload is not UTF-8"))?;
    Ok(CompiledArtifact {
        code,
        mime_type: header.mime_type,
        source_map: header.source_map,
        dependencies: header.dependencies,
    })
}
