//! Local directory catalog
//!
//! Walks a directory and pairs every regular file with the blob-style relative
//! path it is uploaded under. The relative path always starts with the root's
//! own base name.
//!
//! Symlinks are not followed and are not listed, so a symlinked file or
//! directory contributes nothing. Entries come back in walk order, which is
//! stable for one call but otherwise unspecified.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::PathMode;
use crate::error::{Error, Result};
use crate::path::local_relative_path;

/// A local file and the path it takes relative to the catalogued root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFileEntry {
    /// Absolute path of the file on disk
    pub absolute_path: PathBuf,
    /// `/`-separated path led by the root's base name
    pub relative_path: String,
}

/// Catalog every regular file under `root`
pub fn catalog(root: &Path, mode: PathMode) -> Result<Vec<LocalFileEntry>> {
    if !root.exists() {
        return Err(Error::InvalidPath(format!(
            "{} does not exist",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => Error::Io(io),
            None => Error::General(format!("Directory walk failed under {}", root.display())),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let absolute_path = entry.into_path();
        let relative_path = local_relative_path(root, &absolute_path, mode)?;
        entries.push(LocalFileEntry {
            absolute_path,
            relative_path,
        });
    }

    tracing::debug!("Catalogued {} file(s) under {}", entries.len(), root.display());
    Ok(entries)
}
