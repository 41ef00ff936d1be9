//! blobsync-core: Folder semantics over flat blob stores
//!
//! This crate provides the SDK-independent engine:
//! - Local directory cataloguing
//! - Blob listing to local path mapping
//! - Folder upload, download, streaming and deletion
//! - Configuration and error types
//! - The BlobStore trait every backend implements
//!
//! Nothing here depends on a particular storage SDK; the `blobsync-s3` crate
//! supplies the production backend.

pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod path;
pub mod report;
pub mod stream;
pub mod sync;
pub mod traits;

pub use catalog::{LocalFileEntry, catalog};
pub use config::{ConfigManager, ErrorPolicy, PathMode, Settings, StoreConfig};
pub use error::{Error, Result};
pub use mapper::{BlobKeyMapping, KeyFilter, MapOptions, MappingReport, map_blob, map_blobs};
pub use report::{
    DeleteReport, DownloadReport, DownloadedFile, ItemError, NamedStream, StreamSet,
    UploadManifest,
};
pub use stream::BlobWriter;
pub use sync::SyncOrchestrator;
pub use traits::{BlobItem, BlobListing, BlobReader, BlobStore};
