//! Directory traversal for batch compilation.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::SourceError;

/// Lists every regular file under `root`, sorted for deterministic output.
///
/// Entries that cannot be read mid-walk are logged and skipped; a missing
/// root is an error.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let meta = std::fs::metadata(root).map_err(|e| SourceError::from_io(root, e))?;
    if meta.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable entry");
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Visits every file under `root` exactly once, in parallel.
///
/// Each call walks the tree afresh. Visit order is unspecified. Returns the
/// number of files visited.
pub fn for_all_files<F>(root: &Path, visitor: F) -> Result<usize, SourceError>
where
    F: Fn(&Path) + Sync + Send,
{
    let files = collect_files(root)?;
    files.par_iter().for_each(|f| visitor(f));
    Ok(files.len())
}
