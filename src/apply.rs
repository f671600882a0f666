//! File patch applier: read, transform in memory, conditionally rewrite.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::rule::{apply_all, PatchRule};

/// Per-file outcome of one applier invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "ApplyResult should be checked for the per-file outcome"]
pub enum ApplyResult {
    /// At least one rule changed the content; the file was rewritten.
    Updated { before: String, after: String },
    /// No rule changed anything; the file was left untouched.
    Skipped,
    /// The file does not exist.
    Missing,
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Apply `rules` to the file at `path`, rewriting it only if the content
/// changed.
///
/// An unchanged file keeps its content and modification time untouched,
/// so repeated invocations are safe. A changed file is replaced
/// atomically (tempfile + fsync + rename).
pub fn patch_file(path: &Path, rules: &[PatchRule]) -> Result<ApplyResult, PatchError> {
    let result = check_file(path, rules)?;
    if let ApplyResult::Updated { after, .. } = &result {
        atomic_write(path, after.as_bytes())?;

        // Bump mtime so incremental test runners pick up the change.
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(path, now).map_err(|source| PatchError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(result)
}

/// Compute what [`patch_file`] would do without touching the file.
pub fn check_file(path: &Path, rules: &[PatchRule]) -> Result<ApplyResult, PatchError> {
    if !path.exists() {
        return Ok(ApplyResult::Missing);
    }

    let before = fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let after = apply_all(&before, rules);
    if after == before {
        Ok(ApplyResult::Skipped)
    } else {
        Ok(ApplyResult::Updated { before, after })
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), PatchError> {
    let write_err = |source: std::io::Error| PatchError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().ok_or_else(|| {
        write_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    temp.write_all(content).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
