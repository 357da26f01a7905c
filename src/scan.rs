//! Discovery of input files in a directory.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ScanError;

/// List files under `dir` whose extension is one of `extensions`
/// (case-insensitive), sorted by path.
///
/// Only the directory itself is read unless `recursive` is set. Symlinks are
/// not followed.
///
/// # Errors
///
/// `InvalidDirectory` if `dir` is not a directory, `Walk` if an entry cannot
/// be read.
pub fn list_files(dir: &Path, extensions: &[&str], recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::InvalidDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(dir).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    tracing::debug!(dir = %dir.display(), count = files.len(), "input files found");
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}
