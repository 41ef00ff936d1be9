//! In-memory blob store shared by the integration tests

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use blobsync_core::{BlobItem, BlobListing, BlobReader, BlobStore, Error, Result};
use futures::StreamExt;
use url::Url;

/// Blob store backed by maps, with optional listing failures per key
#[derive(Default)]
pub struct MemoryStore {
    containers: Mutex<BTreeSet<String>>,
    blobs: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    failing_keys: Mutex<BTreeSet<String>>,
    failing_transfers: Mutex<BTreeSet<String>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the listing entry for `key` come back as a storage error
    pub fn fail_listing_of(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Make downloads, reads and deletes of `key` fail with a storage error
    pub fn fail_transfer_of(&self, key: &str) {
        self.failing_transfers.lock().unwrap().insert(key.to_string());
    }

    fn check_transfer(&self, key: &str) -> Result<()> {
        if self.failing_transfers.lock().unwrap().contains(key) {
            return Err(Error::Storage(format!("simulated failure transferring {key}")));
        }
        Ok(())
    }

    pub fn put(&self, container: &str, key: &str, data: &[u8]) {
        self.containers.lock().unwrap().insert(container.to_string());
        self.blobs
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data.to_vec());
    }

    pub fn get(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, container: &str) -> BTreeSet<String> {
        self.blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.containers.lock().unwrap().contains(container)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn container_url(&self, container: &str) -> Result<Url> {
        Ok(Url::parse(&format!("https://memory.test/{container}"))?)
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        Ok(self.containers.lock().unwrap().iter().cloned().collect())
    }

    async fn container_exists(&self, container: &str) -> Result<bool> {
        Ok(self.has_container(container))
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        self.containers.lock().unwrap().insert(container.to_string());
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> Result<()> {
        self.containers.lock().unwrap().remove(container);
        self.blobs.lock().unwrap().retain(|(c, _), _| c != container);
        Ok(())
    }

    fn list_blobs(&self, container: &str, prefix: &str) -> BlobListing {
        let failing = self.failing_keys.lock().unwrap().clone();
        let entries: Vec<Result<BlobItem>> = self
            .keys(container)
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .map(|key| {
                if failing.contains(&key) {
                    return Err(Error::Storage(format!("simulated failure listing {key}")));
                }
                let url = self.blob_url(container, &key)?;
                let size = self.get(container, &key).map_or(0, |d| d.len() as i64);
                Ok(BlobItem::new(key, url).with_size(size))
            })
            .collect();
        futures::stream::iter(entries).boxed()
    }

    async fn upload_file(&self, container: &str, key: &str, local: &Path) -> Result<()> {
        let data = tokio::fs::read(local).await?;
        self.put(container, key, &data);
        Ok(())
    }

    async fn download_to_file(&self, container: &str, key: &str, local: &Path) -> Result<()> {
        self.check_transfer(key)?;
        let data = self
            .get(container, key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        tokio::fs::write(local, data).await?;
        Ok(())
    }

    async fn open_read_stream(&self, container: &str, key: &str) -> Result<BlobReader> {
        self.check_transfer(key)?;
        let data = self
            .get(container, key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(Box::pin(std::io::Cursor::new(data)))
    }

    async fn write_blob(&self, container: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.put(container, key, &data);
        Ok(())
    }

    async fn delete_blob(&self, container: &str, key: &str) -> Result<()> {
        self.check_transfer(key)?;
        self.blobs
            .lock()
            .unwrap()
            .remove(&(container.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}
