//! Paged recursive listing
//!
//! Pages through ListObjectsV2 lazily and yields one entry per object. A page
//! request that fails ends the listing with a single error entry, since no
//! continuation token is available to resume from.

use std::collections::VecDeque;

use aws_smithy_types::error::display::DisplayErrorContext;
use blobsync_core::{BlobItem, BlobListing, Error, Result};
use futures::StreamExt;
use url::Url;

/// Objects requested per page
const PAGE_SIZE: i32 = 1000;

struct ListState {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    container_url: Url,
    continuation_token: Option<String>,
    buffer: VecDeque<Result<BlobItem>>,
    done: bool,
}

impl ListState {
    async fn fetch_page(&mut self) -> Result<()> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(PAGE_SIZE);

        if !self.prefix.is_empty() {
            request = request.prefix(&self.prefix);
        }

        if let Some(token) = &self.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| {
            Error::from_storage_message(DisplayErrorContext(&e).to_string(), &self.bucket)
        })?;

        for object in response.contents() {
            let key = object.key().unwrap_or_default().to_string();
            let entry = self.item(key, object);
            self.buffer.push_back(entry);
        }

        if response.is_truncated().unwrap_or(false) {
            self.continuation_token = response.next_continuation_token().map(|s| s.to_string());
            self.done = self.continuation_token.is_none();
        } else {
            self.done = true;
        }

        Ok(())
    }

    fn item(&self, key: String, object: &aws_sdk_s3::types::Object) -> Result<BlobItem> {
        let url = Url::parse(&format!(
            "{}/{}",
            self.container_url.as_str().trim_end_matches('/'),
            key
        ))?;

        let mut item = BlobItem::new(key, url).with_size(object.size().unwrap_or(0));
        if let Some(modified) = object.last_modified() {
            item.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
        }
        Ok(item)
    }
}

/// Lazily list every object under `prefix`
pub(crate) fn list(
    client: aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    container_url: Url,
) -> BlobListing {
    let state = ListState {
        client,
        bucket: bucket.to_string(),
        prefix: prefix.to_string(),
        container_url,
        continuation_token: None,
        buffer: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(entry) = state.buffer.pop_front() {
                return Some((entry, state));
            }
            if state.done {
                return None;
            }
            if let Err(e) = state.fetch_page().await {
                tracing::warn!("Listing of '{}' stopped: {e}", state.prefix);
                state.done = true;
                return Some((Err(e), state));
            }
        }
    })
    .boxed()
}
