//! Path and key arithmetic
//!
//! Blob keys always use `/` as separator. Local paths use the platform separator.
//! Relativization comes in two flavours selected by [`PathMode`]:
//! segment-aware prefix stripping, and the textual substring replacement older
//! tooling used (kept for key compatibility, including its quirks).

use std::path::{Component, Path, PathBuf};

use crate::config::PathMode;
use crate::error::{Error, Result};

/// Last segment of a `/`-separated prefix, ignoring trailing slashes
///
/// Returns an empty string for an empty prefix.
pub fn base_name(prefix: &str) -> &str {
    let trimmed = prefix.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Everything after the last `/` of a key
pub fn file_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(pos) => &key[pos + 1..],
        None => key,
    }
}

/// Destination key for an upload: plain concatenation, no separator inserted
pub fn join_key(blob_path: Option<&str>, name: &str) -> String {
    match blob_path {
        Some(prefix) => format!("{prefix}{name}"),
        None => name.to_string(),
    }
}

/// Base name of a local directory as a string
pub fn local_base_name(root: &Path) -> Result<String> {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::InvalidPath(format!("{} has no final path segment", root.display()))
        })
}

/// Path of `file` relative to `root`, led by the root's own base name
///
/// In [`PathMode::Literal`] every occurrence of the root path string inside the
/// file path is replaced by the base name, so a root that repeats deeper in the
/// tree is replaced there too.
pub fn local_relative_path(root: &Path, file: &Path, mode: PathMode) -> Result<String> {
    let base = local_base_name(root)?;

    let relative = match mode {
        PathMode::Segment => {
            let rest = file.strip_prefix(root).map_err(|_| {
                Error::InvalidPath(format!(
                    "{} is not under {}",
                    file.display(),
                    root.display()
                ))
            })?;
            let mut segments = vec![base];
            segments.extend(
                rest.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned()),
            );
            segments.join("/")
        }
        PathMode::Literal => {
            let root_str = root.to_string_lossy();
            let root_str = root_str.trim_end_matches(['/', '\\']);
            file.to_string_lossy().replace(root_str, &base)
        }
    };

    Ok(relative.replace('\\', "/"))
}

/// Key relative to the container, recovered from a blob URL
///
/// Removes every occurrence of `container_url + "/"`. If the store encodes the
/// blob URL differently from the container URL nothing matches and the whole
/// URL comes back unchanged.
pub fn key_from_url(blob_url: &str, container_url: &str) -> String {
    let container_prefix = format!("{}/", container_url.trim_end_matches('/'));
    blob_url.replace(&container_prefix, "")
}

/// Drop the listing root from a key when the root name should not be kept
pub fn strip_root(key: &str, root_prefix: &str, mode: PathMode) -> String {
    match mode {
        PathMode::Segment => {
            let dir = root_prefix.trim_end_matches('/');
            if dir.is_empty() {
                return key.to_string();
            }
            key.strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(key)
                .to_string()
        }
        PathMode::Literal => {
            let root_name = base_name(root_prefix);
            if root_name.is_empty() {
                return key.to_string();
            }
            key.replacen(&format!("{root_name}/"), "", 1)
        }
    }
}

/// Local save path for a `/`-separated display path under `destination`
///
/// Empty and `.` segments are dropped; `..` is rejected so a key can never
/// resolve outside the destination.
pub fn local_save_path(destination: &Path, display: &str) -> Result<PathBuf> {
    let mut path = destination.to_path_buf();
    for segment in display.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::InvalidPath(format!(
                    "Key '{display}' escapes the destination directory"
                )));
            }
            _ => {}
        }
        // A segment must not carry its own root or drive prefix either
        if Path::new(segment)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::InvalidPath(format!(
                "Key '{display}' contains an invalid segment '{segment}'"
            )));
        }
        path.push(segment);
    }
    Ok(path)
}
