//! Folder-style transfers over a blob store
//!
//! [`SyncOrchestrator`] runs every bulk operation the same way: resolve the
//! container, catalog the local tree or map the remote listing, then transfer
//! items one at a time, awaiting each call before starting the next.
//!
//! Error handling:
//! - Single-item operations return the store's error unchanged.
//! - Listing failures inside a bulk operation are always skipped and recorded.
//! - Per-item transfer failures follow the configured [`ErrorPolicy`].

use std::path::{Path, PathBuf};

use url::Url;

use crate::catalog::catalog;
use crate::config::{ErrorPolicy, StoreConfig};
use crate::error::{Error, Result};
use crate::mapper::{KeyFilter, MapOptions, MappingReport, map_blobs};
use crate::path::{file_name, join_key, local_base_name};
use crate::report::{
    DeleteReport, DownloadReport, DownloadedFile, ItemError, NamedStream, StreamSet,
    UploadManifest,
};
use crate::stream::BlobWriter;
use crate::traits::{BlobReader, BlobStore};

/// Upload, download, stream and delete files and folders in one container
pub struct SyncOrchestrator<S: BlobStore> {
    store: S,
    config: StoreConfig,
}

impl<S: BlobStore> SyncOrchestrator<S> {
    /// Bind a store to a configuration
    pub fn new(store: S, config: StoreConfig) -> Self {
        tracing::debug!(
            "Container: {}, use https: {}",
            config.container_name(),
            config.use_https()
        );
        Self { store, config }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration every call uses
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn container(&self) -> &str {
        self.config.container_name()
    }

    fn policy(&self) -> ErrorPolicy {
        self.config.settings().on_error
    }

    /// Create the container if it does not exist yet
    pub async fn ensure_container(&self) -> Result<()> {
        if !self.store.container_exists(self.container()).await? {
            tracing::debug!("Container '{}' does not exist, creating", self.container());
            self.store.create_container(self.container()).await?;
        }
        Ok(())
    }

    /// Whether the configured container exists
    pub async fn container_exists(&self) -> Result<bool> {
        self.store.container_exists(self.container()).await
    }

    /// Names of all containers in the account
    pub async fn list_containers(&self) -> Result<Vec<String>> {
        self.store.list_containers().await
    }

    /// Upload one file as `blob_path + file name`
    ///
    /// `blob_path` is prepended verbatim; pass a trailing `/` to get a folder.
    pub async fn upload_file(&self, local: &Path, blob_path: Option<&str>) -> Result<Url> {
        if !local.is_file() {
            return Err(Error::InvalidPath(format!(
                "{} is not a file",
                local.display()
            )));
        }

        self.ensure_container().await?;

        let key = join_key(blob_path, &local_base_name(local)?);
        self.store.upload_file(self.container(), &key, local).await?;
        tracing::debug!("Uploaded {} to '{key}'", local.display());

        self.store.blob_url(self.container(), &key)
    }

    /// Upload every file under `local_root`, keyed by `blob_path + relative path`
    ///
    /// Relative paths start with the folder's own name, so `photos/a.jpg` with
    /// `blob_path = Some("backup/")` lands at `backup/photos/a.jpg`.
    pub async fn upload_folder(
        &self,
        local_root: &Path,
        blob_path: Option<&str>,
    ) -> Result<UploadManifest> {
        self.ensure_container().await?;

        let entries = catalog(local_root, self.config.settings().path_mode)?;
        tracing::debug!("Number of files: {}", entries.len());

        let root_key = join_key(blob_path, &local_base_name(local_root)?);
        let mut manifest = UploadManifest {
            local_root: local_root.to_path_buf(),
            root_url: self.store.blob_url(self.container(), &root_key)?,
            keys: Vec::with_capacity(entries.len()),
            errors: Vec::new(),
        };

        for (count, entry) in entries.iter().enumerate() {
            let key = join_key(blob_path, &entry.relative_path);
            match self
                .store
                .upload_file(self.container(), &key, &entry.absolute_path)
                .await
            {
                Ok(()) => {
                    tracing::debug!(
                        "Count: {}, uploaded {} to '{key}'",
                        count + 1,
                        entry.absolute_path.display()
                    );
                    manifest.keys.push(key);
                }
                Err(e) => self.record_or_abort(
                    &mut manifest.errors,
                    entry.absolute_path.display().to_string(),
                    e,
                )?,
            }
        }

        tracing::info!(
            "Uploaded {} file(s) to {}",
            manifest.keys.len(),
            manifest.root_url
        );
        Ok(manifest)
    }

    /// Download one blob into `save_dir`, named after the key's last segment
    pub async fn download_file(&self, blob_key: &str, save_dir: &Path) -> Result<PathBuf> {
        let local = save_dir.join(file_name(blob_key));
        tokio::fs::create_dir_all(save_dir).await?;

        self.store
            .download_to_file(self.container(), blob_key, &local)
            .await?;
        tracing::debug!("Saved '{blob_key}' to {}", local.display());

        Ok(local)
    }

    /// Download every blob under `prefix` into `save_dir`
    ///
    /// With `keep_root_name` the files land at `save_dir/<full key>`, otherwise
    /// the prefix folder is dropped from the front of each path.
    pub async fn download_folder(
        &self,
        prefix: &str,
        save_dir: &Path,
        keep_root_name: bool,
    ) -> Result<DownloadReport> {
        let options = MapOptions {
            root_prefix: prefix.to_string(),
            destination: Some(save_dir.to_path_buf()),
            keep_root_name,
            filter: None,
            mode: self.config.settings().path_mode,
        };
        let mapped = self.map_listing(&options).await?;
        tracing::debug!("Number of files: {}", mapped.mappings.len());

        let mut report = DownloadReport {
            destination: save_dir.to_path_buf(),
            files: Vec::with_capacity(mapped.mappings.len()),
            errors: mapped.errors,
        };

        for (count, mapping) in mapped.mappings.into_iter().enumerate() {
            let Some(local) = mapping.local_path else {
                continue;
            };
            match self.download_one(&mapping.blob_key, &local).await {
                Ok(()) => {
                    tracing::debug!(
                        "Count: {}, saved '{}' to {}",
                        count + 1,
                        mapping.blob_key,
                        local.display()
                    );
                    report.files.push(DownloadedFile {
                        key: mapping.blob_key,
                        path: local,
                    });
                }
                Err(e) => self.record_or_abort(&mut report.errors, mapping.blob_key, e)?,
            }
        }

        tracing::info!(
            "Downloaded {} file(s) to {}",
            report.files.len(),
            save_dir.display()
        );
        Ok(report)
    }

    async fn download_one(&self, key: &str, local: &Path) -> Result<()> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.store
            .download_to_file(self.container(), key, local)
            .await
    }

    /// Open a read stream over one blob; the caller owns and closes it
    pub async fn open_read_stream(&self, blob_key: &str) -> Result<BlobReader> {
        self.store.open_read_stream(self.container(), blob_key).await
    }

    /// Open a stream per blob under `prefix`, named by full key
    pub async fn stream_folder(&self, prefix: &str) -> Result<StreamSet> {
        self.stream_mapped(MapOptions {
            root_prefix: prefix.to_string(),
            keep_root_name: true,
            mode: self.config.settings().path_mode,
            ..Default::default()
        })
        .await
    }

    /// Open a stream per blob under `prefix`, named without the prefix folder
    pub async fn stream_folder_named(&self, prefix: &str) -> Result<StreamSet> {
        self.stream_mapped(MapOptions {
            root_prefix: prefix.to_string(),
            keep_root_name: false,
            mode: self.config.settings().path_mode,
            ..Default::default()
        })
        .await
    }

    /// Open a stream per blob anywhere in the container whose key matches `pattern`
    pub async fn stream_matching(&self, pattern: &str) -> Result<StreamSet> {
        self.stream_mapped(MapOptions {
            root_prefix: String::new(),
            keep_root_name: true,
            filter: Some(KeyFilter::pattern(pattern)?),
            mode: self.config.settings().path_mode,
            ..Default::default()
        })
        .await
    }

    async fn stream_mapped(&self, options: MapOptions) -> Result<StreamSet> {
        let mapped = self.map_listing(&options).await?;
        let mut set = StreamSet {
            streams: Vec::with_capacity(mapped.mappings.len()),
            errors: mapped.errors,
        };

        for (count, mapping) in mapped.mappings.into_iter().enumerate() {
            match self
                .store
                .open_read_stream(self.container(), &mapping.blob_key)
                .await
            {
                Ok(reader) => {
                    tracing::debug!("Count: {}, opened '{}'", count + 1, mapping.blob_key);
                    set.streams.push(NamedStream {
                        name: mapping.display_path,
                        key: mapping.blob_key,
                        reader,
                    });
                }
                Err(e) => self.record_or_abort(&mut set.errors, mapping.blob_key, e)?,
            }
        }

        Ok(set)
    }

    /// Write a blob from memory and return its URL
    pub async fn write_blob(&self, blob_key: &str, content: Vec<u8>) -> Result<Url> {
        self.store
            .write_blob(self.container(), blob_key, content)
            .await?;
        tracing::debug!("Wrote '{blob_key}'");
        self.store.blob_url(self.container(), blob_key)
    }

    /// Open a buffered write stream; nothing is stored until it is committed
    pub fn open_write_stream(&self, blob_key: &str) -> BlobWriter<'_, S> {
        BlobWriter::new(&self.store, self.container(), blob_key)
    }

    /// Delete one blob and return the URL it had
    pub async fn delete_file(&self, blob_key: &str) -> Result<Url> {
        self.store.delete_blob(self.container(), blob_key).await?;
        tracing::debug!("Deleted '{blob_key}'");
        self.store.blob_url(self.container(), blob_key)
    }

    /// Delete every blob under `prefix`, one call per blob
    ///
    /// Not transactional: blobs deleted before a failure stay deleted.
    pub async fn delete_folder(&self, prefix: &str) -> Result<DeleteReport> {
        let options = MapOptions {
            root_prefix: prefix.to_string(),
            mode: self.config.settings().path_mode,
            ..Default::default()
        };
        let mapped = self.map_listing(&options).await?;

        let mut report = DeleteReport {
            prefix_url: self.store.blob_url(self.container(), prefix)?,
            deleted: Vec::with_capacity(mapped.mappings.len()),
            errors: mapped.errors,
        };

        for mapping in mapped.mappings {
            match self
                .store
                .delete_blob(self.container(), &mapping.blob_key)
                .await
            {
                Ok(()) => {
                    tracing::debug!("Deleted '{}'", mapping.blob_key);
                    report.deleted.push(mapping.blob_key);
                }
                Err(e) => self.record_or_abort(&mut report.errors, mapping.blob_key, e)?,
            }
        }

        tracing::info!("Deleted {} blob(s) under '{prefix}'", report.deleted.len());
        Ok(report)
    }

    /// Delete the configured container if it exists
    pub async fn delete_container(&self) -> Result<()> {
        self.store.delete_container(self.container()).await?;
        tracing::debug!("Deleted container '{}'", self.container());
        Ok(())
    }

    async fn map_listing(&self, options: &MapOptions) -> Result<MappingReport> {
        let container_url = self.store.container_url(self.container())?;
        let listing = self.store.list_blobs(self.container(), &options.root_prefix);
        Ok(map_blobs(listing, &container_url, options).await)
    }

    fn record_or_abort(
        &self,
        errors: &mut Vec<ItemError>,
        item: impl Into<String>,
        error: Error,
    ) -> Result<()> {
        match self.policy() {
            ErrorPolicy::Abort => Err(error),
            ErrorPolicy::Continue => {
                let item = item.into();
                tracing::warn!("Skipping '{item}': {error}");
                errors.push(ItemError::new(item, &error));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::traits::MockBlobStore;
    use mockall::predicate::eq;
    use tempfile::TempDir;

    fn url_for(container: &str, key: &str) -> Url {
        Url::parse(&format!("https://acct.example.com/{container}/{key}")).unwrap()
    }

    fn config(on_error: ErrorPolicy) -> StoreConfig {
        let settings = Settings {
            on_error,
            ..Default::default()
        };
        StoreConfig::with_settings("acct", "secret", "media", settings).unwrap()
    }

    fn with_urls(store: &mut MockBlobStore) {
        store
            .expect_container_url()
            .returning(|c| Ok(Url::parse(&format!("https://acct.example.com/{c}")).unwrap()));
        store
            .expect_blob_url()
            .returning(|c, k| Ok(url_for(c, k)));
    }

    #[tokio::test]
    async fn test_ensure_container_creates_when_missing() {
        let mut store = MockBlobStore::new();
        store
            .expect_container_exists()
            .with(eq("media"))
            .returning(|_| Ok(false));
        store
            .expect_create_container()
            .with(eq("media"))
            .times(1)
            .returning(|_| Ok(()));

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        sync.ensure_container().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_container_skips_existing() {
        let mut store = MockBlobStore::new();
        store.expect_container_exists().returning(|_| Ok(true));
        store.expect_create_container().never();

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        sync.ensure_container().await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_file_concatenates_blob_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.jpg");
        std::fs::write(&file, b"a").unwrap();

        let mut store = MockBlobStore::new();
        with_urls(&mut store);
        store.expect_container_exists().returning(|_| Ok(true));
        store
            .expect_upload_file()
            .withf(|c, k, _| c == "media" && k == "backupa.jpg")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        let url = sync.upload_file(&file, Some("backup")).await.unwrap();
        assert_eq!(url.as_str(), "https://acct.example.com/media/backupa.jpg");
    }

    #[tokio::test]
    async fn test_upload_file_propagates_store_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.jpg");
        std::fs::write(&file, b"a").unwrap();

        let mut store = MockBlobStore::new();
        with_urls(&mut store);
        store.expect_container_exists().returning(|_| Ok(true));
        store
            .expect_upload_file()
            .returning(|_, _, _| Err(Error::Storage("503 Slow Down".into())));

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Continue));
        let err = sync.upload_file(&file, None).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_upload_file_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = MockBlobStore::new();

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        let err = sync.upload_file(temp_dir.path(), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_upload_folder_abort_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("docs");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a.txt"), b"a").unwrap();
        std::fs::write(root.join("b.txt"), b"b").unwrap();

        let mut store = MockBlobStore::new();
        with_urls(&mut store);
        store.expect_container_exists().returning(|_| Ok(true));
        store
            .expect_upload_file()
            .times(1)
            .returning(|_, _, _| Err(Error::Storage("disk full".into())));

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        let err = sync.upload_folder(&root, None).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_upload_folder_continue_records_failures() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("docs");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a.txt"), b"a").unwrap();
        std::fs::write(root.join("b.txt"), b"b").unwrap();

        let mut store = MockBlobStore::new();
        with_urls(&mut store);
        store.expect_container_exists().returning(|_| Ok(true));
        store
            .expect_upload_file()
            .times(2)
            .returning(|_, key, _| {
                if key == "docs/a.txt" {
                    Err(Error::Storage("disk full".into()))
                } else {
                    Ok(())
                }
            });

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Continue));
        let manifest = sync.upload_folder(&root, None).await.unwrap();
        assert_eq!(manifest.keys, vec!["docs/b.txt".to_string()]);
        assert_eq!(manifest.errors.len(), 1);
        assert!(!manifest.is_complete());
        assert_eq!(manifest.root_url.as_str(), "https://acct.example.com/media/docs");
    }

    #[tokio::test]
    async fn test_download_file_propagates_not_found() {
        let temp_dir = TempDir::new().unwrap();

        let mut store = MockBlobStore::new();
        store
            .expect_download_to_file()
            .returning(|_, key, _| Err(Error::NotFound(key.to_string())));

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Continue));
        let err = sync
            .download_file("photos/missing.jpg", temp_dir.path())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_file_returns_blob_url() {
        let mut store = MockBlobStore::new();
        with_urls(&mut store);
        store
            .expect_delete_blob()
            .with(eq("media"), eq("photos/a.jpg"))
            .times(1)
            .returning(|_, _| Ok(()));

        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        let url = sync.delete_file("photos/a.jpg").await.unwrap();
        assert_eq!(url.as_str(), "https://acct.example.com/media/photos/a.jpg");
    }

    #[tokio::test]
    async fn test_stream_matching_rejects_bad_pattern() {
        let store = MockBlobStore::new();
        let sync = SyncOrchestrator::new(store, config(ErrorPolicy::Abort));
        let err = sync.stream_matching("(unclosed").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }
}
