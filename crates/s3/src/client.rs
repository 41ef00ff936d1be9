//! S3 blob store implementation
//!
//! Wraps aws-sdk-s3 and implements the BlobStore trait from blobsync-core.
//! Buckets are addressed path-style, so a container URL is
//! `<endpoint>/<bucket>` and a blob URL `<endpoint>/<bucket>/<key>`.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::error::display::DisplayErrorContext;
use futures::StreamExt;
use url::Url;

use blobsync_core::{BlobListing, BlobReader, BlobStore, Error, Result, StoreConfig};

use crate::listing;

/// Region that must not be sent as a bucket location constraint
const DEFAULT_REGION: &str = "us-east-1";

fn storage_error<E>(e: &E, subject: &str) -> Error
where
    E: std::error::Error,
{
    Error::from_storage_message(DisplayErrorContext(e).to_string(), subject)
}

/// Content type guessed from the file extension
fn content_type_for(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}

/// S3-compatible blob store
pub struct S3BlobStore {
    inner: aws_sdk_s3::Client,
    endpoint: Url,
    region: String,
}

impl S3BlobStore {
    /// Resolve the account described by `config` into a client
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let settings = config.settings();
        let endpoint = settings.endpoint_url()?;
        let region = settings.region.clone();

        let credentials = aws_credential_types::Credentials::new(
            config.account_name(),
            config.account_key(),
            None, // session token
            None, // expiry
            "blobsync-static-credentials",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region.clone()))
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        tracing::debug!("Account URI: {endpoint}, region: {region}");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            endpoint,
            region,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn container_url(&self, container: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            container
        ))?)
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| storage_error(&e, "buckets"))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(|n| n.to_string()))
            .collect())
    }

    async fn container_exists(&self, container: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(container).send().await {
            Ok(_) => Ok(true),
            Err(e) => match storage_error(&e, container) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};

        let mut request = self.inner.create_bucket().bucket(container);
        if self.region != DEFAULT_REGION {
            let constraint = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(constraint);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let err_str = DisplayErrorContext(&e).to_string();
                if err_str.contains("BucketAlreadyOwnedByYou") {
                    Ok(())
                } else {
                    Err(Error::Storage(err_str))
                }
            }
        }
    }

    async fn delete_container(&self, container: &str) -> Result<()> {
        match self.inner.delete_bucket().bucket(container).send().await {
            Ok(_) => Ok(()),
            Err(e) => match storage_error(&e, container) {
                Error::NotFound(_) => Ok(()),
                other => Err(other),
            },
        }
    }

    fn list_blobs(&self, container: &str, prefix: &str) -> BlobListing {
        match self.container_url(container) {
            Ok(container_url) => {
                listing::list(self.inner.clone(), container, prefix, container_url)
            }
            Err(e) => futures::stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn upload_file(&self, container: &str, key: &str, local: &Path) -> Result<()> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Error::InvalidPath(format!("{}: {e}", local.display())))?;

        let mut request = self
            .inner
            .put_object()
            .bucket(container)
            .key(key)
            .body(body);

        if let Some(ct) = content_type_for(local) {
            request = request.content_type(ct);
        }

        request.send().await.map_err(|e| storage_error(&e, key))?;
        Ok(())
    }

    async fn download_to_file(&self, container: &str, key: &str, local: &Path) -> Result<()> {
        let response = self
            .inner
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error(&e, key))?;

        let mut body = Box::pin(response.body.into_async_read());
        let mut file = tokio::fs::File::create(local).await?;
        tokio::io::copy(&mut body, &mut file).await?;
        Ok(())
    }

    async fn open_read_stream(&self, container: &str, key: &str) -> Result<BlobReader> {
        let response = self
            .inner
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error(&e, key))?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    async fn write_blob(&self, container: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.inner
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| storage_error(&e, key))?;
        Ok(())
    }

    async fn delete_blob(&self, container: &str, key: &str) -> Result<()> {
        // DeleteObject succeeds for absent keys, so check first
        match self.inner.head_object().bucket(container).key(key).send().await {
            Ok(_) => {}
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(e) => return Err(storage_error(&e, key)),
        }

        self.inner
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error(&e, key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobsync_core::Settings;

    async fn store(use_https: bool) -> S3BlobStore {
        let settings = Settings {
            use_https,
            endpoint: "localhost:9000".into(),
            ..Default::default()
        };
        let config =
            StoreConfig::with_settings("accesskey", "secretkey", "media", settings).unwrap();
        S3BlobStore::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_container_url_is_path_style() {
        let store = store(true).await;
        assert_eq!(
            store.container_url("media").unwrap().as_str(),
            "https://localhost:9000/media"
        );
    }

    #[tokio::test]
    async fn test_blob_url_honours_scheme() {
        let store = store(false).await;
        assert_eq!(
            store.blob_url("media", "photos/a.jpg").unwrap().as_str(),
            "http://localhost:9000/media/photos/a.jpg"
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(
            content_type_for(Path::new("photos/a.jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(content_type_for(Path::new("README")), None);
    }
}
