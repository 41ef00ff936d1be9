//! BlobStore trait definition
//!
//! This trait is the whole boundary between the engine and a remote object store.
//! It is implemented by the S3 adapter and mocked in tests.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use url::Url;

use crate::error::{Error, Result};

/// A blob returned by a recursive listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobItem {
    /// Key relative to the container root
    pub key: String,

    /// Full URL of the blob as reported by the store
    pub url: Url,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl BlobItem {
    /// Create a new BlobItem without size information
    pub fn new(key: impl Into<String>, url: Url) -> Self {
        Self {
            key: key.into(),
            url,
            size_bytes: None,
            size_human: None,
            last_modified: None,
        }
    }

    /// Attach the blob size
    pub fn with_size(mut self, size: i64) -> Self {
        self.size_bytes = Some(size);
        self.size_human = Some(humansize::format_size(
            size.max(0) as u64,
            humansize::BINARY,
        ));
        self
    }
}

/// Recursive listing, one fallible entry per blob
///
/// An `Err` entry is a failure encountered mid-enumeration; consumers decide
/// whether to skip it or stop.
pub type BlobListing = BoxStream<'static, Result<BlobItem>>;

/// Readable blob content; the caller owns it and decides when to drop it
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Trait for blob store operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// URL of a container, without a trailing slash
    fn container_url(&self, container: &str) -> Result<Url>;

    /// URL of a blob: the container URL, a slash, then the key
    fn blob_url(&self, container: &str, key: &str) -> Result<Url> {
        let container_url = self.container_url(container)?;
        Url::parse(&format!(
            "{}/{}",
            container_url.as_str().trim_end_matches('/'),
            key
        ))
        .map_err(Error::from)
    }

    /// List container names in the account
    async fn list_containers(&self) -> Result<Vec<String>>;

    /// Check if a container exists
    async fn container_exists(&self, container: &str) -> Result<bool>;

    /// Create a container, succeeding if it already exists
    async fn create_container(&self, container: &str) -> Result<()>;

    /// Delete a container, succeeding if it does not exist
    async fn delete_container(&self, container: &str) -> Result<()>;

    /// List every blob whose key starts with `prefix`, at any depth
    fn list_blobs(&self, container: &str, prefix: &str) -> BlobListing;

    /// Upload a local file to `key`
    async fn upload_file(&self, container: &str, key: &str, local: &Path) -> Result<()>;

    /// Download `key` into a local file, replacing it
    async fn download_to_file(&self, container: &str, key: &str, local: &Path) -> Result<()>;

    /// Open a read stream over a blob
    async fn open_read_stream(&self, container: &str, key: &str) -> Result<BlobReader>;

    /// Write a blob from memory, replacing it
    async fn write_blob(&self, container: &str, key: &str, data: Vec<u8>) -> Result<()>;

    /// Delete a single blob
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when the blob does not exist.
    async fn delete_blob(&self, container: &str, key: &str) -> Result<()>;
}
