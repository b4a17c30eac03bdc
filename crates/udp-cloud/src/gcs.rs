use async_trait::async_trait;
use bytes::Bytes;
use gcloud_storage::client::{Client, ClientConfig};
use gcloud_storage::http::objects::delete::DeleteObjectRequest;
use gcloud_storage::http::objects::download::Range;
use gcloud_storage::http::objects::get::GetObjectRequest;
use gcloud_storage::http::objects::list::ListObjectsRequest;
use gcloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};

use crate::traits::{CloudError, ObjectStore};

/// An [`ObjectStore`] backed by a single GCS bucket.
pub struct GcsObjectStore {
    client: Client,
    bucket: String,
}

impl GcsObjectStore {
    pub async fn new(bucket: impl Into<String>) -> Result<Self, CloudError> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(Self {
            client: Client::new(config),
            bucket: bucket.into(),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), CloudError> {
        let upload_type = UploadType::Simple(Media::new(key.to_string()));
        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                body.to_vec(),
                &upload_type,
            )
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, CloudError> {
        let data = self
            .client
            .download_object(
                &GetObjectRequest {
                    bucket: self.bucket.clone(),
                    object: key.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(|_| CloudError::NotFound(key.to_string()))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), CloudError> {
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket.clone(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, CloudError> {
        let response = self
            .client
            .list_objects(&ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                ..Default::default()
            })
            .await
            .map_err(|err| CloudError::Other(anyhow::anyhow!(err)))?;
        Ok(response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|object| object.name)
            .collect())
    }
}
