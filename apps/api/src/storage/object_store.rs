use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, warn};

use super::retry::with_retry;
use super::{StorageBackend, StorageError};
use crate::cache::entry::{EntryMetadata, StoredObject};
use crate::config::S3Settings;
use crate::retry::RetryPolicy;

const BACKEND_NAME: &str = "object-store";

/// Cache entries stored in an S3-compatible bucket (AWS S3 or MinIO).
///
/// Entry metadata travels as S3 user metadata. Every call is bounded by the
/// retry policy's timeout and retried with exponential backoff.
#[derive(Clone)]
pub struct ObjectStoreBackend {
    client: Client,
    bucket: String,
    policy: RetryPolicy,
}

impl ObjectStoreBackend {
    /// Builds a client for MinIO (custom endpoint) or AWS (no endpoint).
    pub async fn connect(settings: &S3Settings, policy: RetryPolicy) -> Self {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "folio-static",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint.is_some())
            .build();

        Self::from_client(Client::from_conf(s3_config), settings.bucket.clone(), policy)
    }

    pub fn from_client(client: Client, bucket: String, policy: RetryPolicy) -> Self {
        Self {
            client,
            bucket,
            policy,
        }
    }

    async fn head(&self, key: &str) -> Result<Option<HashMap<String, String>>, StorageError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = key.to_string();
        with_retry(BACKEND_NAME, "head", &self.policy, || {
            let request = client.head_object().bucket(&bucket).key(&key);
            async move {
                match request.send().await {
                    Ok(output) => Ok(Some(output.metadata().cloned().unwrap_or_default())),
                    Err(e) => {
                        let not_found = e
                            .as_service_error()
                            .map(|se| se.is_not_found())
                            .unwrap_or(false);
                        if not_found {
                            Ok(None)
                        } else {
                            Err(DisplayErrorContext(e).to_string())
                        }
                    }
                }
            }
        })
        .await
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        metadata: &EntryMetadata,
    ) -> Result<(), StorageError> {
        let user_metadata = metadata.to_user_metadata();
        let size = bytes.len();
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let owned_key = key.to_string();
        let content_type = content_type.to_string();

        with_retry(BACKEND_NAME, "put", &self.policy, || {
            let request = client
                .put_object()
                .bucket(&bucket)
                .key(&owned_key)
                .body(ByteStream::from(bytes.clone()))
                .content_type(&content_type)
                .set_metadata(Some(user_metadata.clone()));
            async move {
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| DisplayErrorContext(e).to_string())
            }
        })
        .await?;

        debug!(bucket = %self.bucket, key, size, "Uploaded cache entry");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let owned_key = key.to_string();

        let fetched = with_retry(BACKEND_NAME, "get", &self.policy, || {
            let request = client.get_object().bucket(&bucket).key(&owned_key);
            async move {
                let output = match request.send().await {
                    Ok(output) => output,
                    Err(e) => {
                        let no_such_key = e
                            .as_service_error()
                            .map(|se| se.is_no_such_key())
                            .unwrap_or(false);
                        return if no_such_key {
                            Ok(None)
                        } else {
                            Err(DisplayErrorContext(e).to_string())
                        };
                    }
                };
                let metadata = output.metadata().cloned();
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| format!("failed to read object body: {e}"))?;
                Ok(Some((body.into_bytes(), metadata)))
            }
        })
        .await?;

        Ok(fetched.map(|(bytes, user_metadata)| {
            let metadata = user_metadata
                .as_ref()
                .and_then(EntryMetadata::from_user_metadata);
            if metadata.is_none() {
                warn!(bucket = %self.bucket, key, "Object has no usable cache metadata");
            }
            StoredObject { bytes, metadata }
        }))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.head(key).await?.is_some())
    }

    async fn metadata(&self, key: &str) -> Result<Option<EntryMetadata>, StorageError> {
        Ok(self
            .head(key)
            .await?
            .and_then(|map| EntryMetadata::from_user_metadata(&map)))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let owned_key = key.to_string();
        with_retry(BACKEND_NAME, "delete", &self.policy, || {
            let request = client.delete_object().bucket(&bucket).key(&owned_key);
            async move {
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| DisplayErrorContext(e).to_string())
            }
        })
        .await
    }
}
