//! Blob key mapping
//!
//! Turns a recursive container listing into `(blob key, display path)` pairs and,
//! when a destination directory is given, into local save paths.
//!
//! Enumeration is best effort: a listing entry that fails, or a key that cannot
//! be mapped to a safe local path, is logged and recorded in
//! [`MappingReport::errors`] and the remaining entries are still mapped. Callers
//! must not assume the mapping count equals the number of blobs under the prefix.

use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::config::PathMode;
use crate::error::Result;
use crate::path::{key_from_url, local_save_path, strip_root};
use crate::report::ItemError;
use crate::traits::BlobItem;

/// Selects which blob keys take part in a mapping
#[derive(Debug, Clone)]
pub enum KeyFilter {
    /// Keys starting with the given string
    Prefix(String),
    /// Keys the regular expression matches anywhere
    Pattern(Regex),
}

impl KeyFilter {
    /// Compile a regular expression filter
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(KeyFilter::Pattern(Regex::new(pattern)?))
    }

    /// Whether a blob key passes the filter
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyFilter::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyFilter::Pattern(regex) => regex.is_match(key),
        }
    }
}

/// Inputs that shape how listed blobs are mapped
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Prefix the listing was taken under
    pub root_prefix: String,
    /// Local directory display paths are joined onto, if saving to disk
    pub destination: Option<PathBuf>,
    /// Keep the root folder name at the front of display paths
    pub keep_root_name: bool,
    /// Optional key filter
    pub filter: Option<KeyFilter>,
    /// Relativization mode
    pub mode: PathMode,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            root_prefix: String::new(),
            destination: None,
            keep_root_name: true,
            filter: None,
            mode: PathMode::default(),
        }
    }
}

/// One listed blob and where it goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobKeyMapping {
    /// Key relative to the container root
    pub blob_key: String,
    /// Key as presented to the caller, root name kept or stripped
    pub display_path: String,
    /// `display_path` under the destination directory, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

/// Mappings produced from one listing plus the entries that were skipped
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    /// Mapped blobs, in listing order
    pub mappings: Vec<BlobKeyMapping>,
    /// Entries that could not be listed or mapped
    pub errors: Vec<ItemError>,
}

/// Map a single listed blob
///
/// Returns `Ok(None)` when the filter rejects the key, and for directory
/// marker objects (keys ending in `/`, or that map to an empty display path).
pub fn map_blob(
    item: &BlobItem,
    container_url: &Url,
    options: &MapOptions,
) -> Result<Option<BlobKeyMapping>> {
    let blob_key = match options.mode {
        PathMode::Segment => item.key.clone(),
        PathMode::Literal => key_from_url(item.url.as_str(), container_url.as_str()),
    };

    if let Some(filter) = &options.filter {
        if !filter.matches(&blob_key) {
            return Ok(None);
        }
    }

    if blob_key.ends_with('/') {
        tracing::debug!("Skipping directory marker '{blob_key}'");
        return Ok(None);
    }

    let display_path = if options.keep_root_name {
        blob_key.clone()
    } else {
        strip_root(&blob_key, &options.root_prefix, options.mode)
    };

    if display_path.is_empty() {
        tracing::debug!("Skipping '{blob_key}': nothing left after the root name");
        return Ok(None);
    }

    let local_path = options
        .destination
        .as_deref()
        .map(|destination: &Path| local_save_path(destination, &display_path))
        .transpose()?;

    Ok(Some(BlobKeyMapping {
        blob_key,
        display_path,
        local_path,
    }))
}

/// Map every entry of a listing, skipping and recording failures
pub async fn map_blobs<L>(
    mut listing: L,
    container_url: &Url,
    options: &MapOptions,
) -> MappingReport
where
    L: Stream<Item = Result<BlobItem>> + Unpin,
{
    let mut report = MappingReport::default();

    while let Some(entry) = listing.next().await {
        let item = match entry {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable listing entry under '{}': {e}",
                    options.root_prefix
                );
                report
                    .errors
                    .push(ItemError::new(format!("{}*", options.root_prefix), &e));
                continue;
            }
        };

        match map_blob(&item, container_url, options) {
            Ok(Some(mapping)) => report.mappings.push(mapping),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Skipping blob '{}': {e}", item.key);
                report.errors.push(ItemError::new(item.key.as_str(), &e));
            }
        }
    }

    tracing::debug!(
        "Mapped {} blob(s) under '{}', skipped {}",
        report.mappings.len(),
        options.root_prefix,
        report.errors.len()
    );
    report
}
