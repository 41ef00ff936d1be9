//! Results of bulk operations
//!
//! Every bulk operation returns what it did together with what it skipped, so a
//! count mismatch between listed and transferred items is visible to the caller
//! rather than an error.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::error::Error;
use crate::traits::BlobReader;

/// A single item that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// Blob key, blob URL or local path of the item
    pub item: String,
    /// Error message
    pub error: String,
}

impl ItemError {
    /// Record an error against an item
    pub fn new(item: impl Into<String>, error: &Error) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}

/// Outcome of a folder upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadManifest {
    /// Local folder that was catalogued
    pub local_root: PathBuf,
    /// URL of the common prefix every uploaded key shares
    pub root_url: Url,
    /// Keys written, in transfer order
    pub keys: Vec<String>,
    /// Items that failed under [`ErrorPolicy::Continue`](crate::ErrorPolicy::Continue)
    pub errors: Vec<ItemError>,
}

impl UploadManifest {
    /// Whether every catalogued file was uploaded
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A blob saved to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    /// Source blob key
    pub key: String,
    /// Local file written
    pub path: PathBuf,
}

/// Outcome of a folder download
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    /// Directory the files were saved under
    pub destination: PathBuf,
    /// Files written, in listing order
    pub files: Vec<DownloadedFile>,
    /// Listing or transfer failures that were skipped
    pub errors: Vec<ItemError>,
}

impl DownloadReport {
    /// Whether every listed blob was saved
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of a prefix delete
///
/// Deletion is not transactional: on failure `deleted` holds what is already gone.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    /// URL of the prefix that was removed
    pub prefix_url: Url,
    /// Keys deleted, in listing order
    pub deleted: Vec<String>,
    /// Listing or delete failures that were skipped
    pub errors: Vec<ItemError>,
}

impl DeleteReport {
    /// Whether every listed blob was deleted
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An open blob stream with the name it is presented under
pub struct NamedStream {
    /// Display name, the key with or without the root name
    pub name: String,
    /// Blob key the stream reads
    pub key: String,
    /// Open stream; dropping it closes it
    pub reader: BlobReader,
}

impl fmt::Debug for NamedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedStream")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Streams opened over a set of blobs
#[derive(Debug, Default)]
pub struct StreamSet {
    /// Open streams, in listing order
    pub streams: Vec<NamedStream>,
    /// Listing or open failures that were skipped
    pub errors: Vec<ItemError>,
}

impl StreamSet {
    /// Display names in stream order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }

    /// Drop the names and keep the readers
    pub fn into_readers(self) -> Vec<BlobReader> {
        self.streams.into_iter().map(|s| s.reader).collect()
    }
}
