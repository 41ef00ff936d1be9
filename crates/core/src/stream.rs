//! Write streams
//!
//! A [`BlobWriter`] buffers everything written to it and sends it to the store
//! when [`BlobWriter::commit`] is awaited. Dropping an uncommitted writer
//! discards the buffer and leaves the blob untouched.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;
use url::Url;

use crate::error::Result;
use crate::traits::BlobStore;

/// Buffered writer for a single blob
pub struct BlobWriter<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    container: String,
    key: String,
    buffer: Vec<u8>,
}

impl<'a, S: BlobStore + ?Sized> BlobWriter<'a, S> {
    /// Create a writer for `key` in `container`
    pub fn new(store: &'a S, container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            key: key.into(),
            buffer: Vec::new(),
        }
    }

    /// Blob key this writer targets
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bytes buffered so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Upload the buffered bytes and return the blob URL
    pub async fn commit(self) -> Result<Url> {
        let size = self.buffer.len();
        self.store
            .write_blob(&self.container, &self.key, self.buffer)
            .await?;
        tracing::debug!("Committed {size} byte(s) to '{}'", self.key);
        self.store.blob_url(&self.container, &self.key)
    }
}

impl<S: BlobStore + ?Sized> AsyncWrite for BlobWriter<'_, S> {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockBlobStore;
    use mockall::predicate::eq;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_commit_uploads_buffer() {
        let mut store = MockBlobStore::new();
        store
            .expect_write_blob()
            .with(eq("notes"), eq("today.txt"), eq(b"hello world".to_vec()))
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_blob_url()
            .returning(|c, k| {
                Ok(Url::parse(&format!("https://acct.example.com/{c}/{k}")).unwrap())
            });

        let mut writer = BlobWriter::new(&store, "notes", "today.txt");
        writer.write_all(b"hello ").await.unwrap();
        writer.write_all(b"world").await.unwrap();
        assert_eq!(writer.len(), 11);

        let url = writer.commit().await.unwrap();
        assert_eq!(url.as_str(), "https://acct.example.com/notes/today.txt");
    }

    #[tokio::test]
    async fn test_dropped_writer_uploads_nothing() {
        let mut store = MockBlobStore::new();
        store.expect_write_blob().never();

        let mut writer = BlobWriter::new(&store, "notes", "draft.txt");
        writer.write_all(b"discarded").await.unwrap();
        drop(writer);
    }
}
