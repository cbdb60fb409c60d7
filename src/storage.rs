use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

/// S3/MinIO-backed document storage.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        // path-style keeps MinIO happy
        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_not_found()) == Some(true) {
                    Ok(false)
                } else {
                    Err(anyhow::Error::from(e)).context("s3 head_object")
                }
            }
        }
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(seconds),
            )?)
            .await
            .context("s3 presign_get")?;
        Ok(presigned.uri().to_string())
    }
}

/// In-memory storage for unit tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: std::sync::Mutex<std::collections::HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("no such key: {}", key))
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
        Ok(format!("https://fake.local/{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_put_exists_delete() {
        let storage = MemoryStorage::default();
        let key = "documents/u1/id/abc.png";

        assert!(!storage.exists(key).await.unwrap());
        storage
            .put_object(key, Bytes::from_static(b"img"), "image/png")
            .await
            .unwrap();
        assert!(storage.exists(key).await.unwrap());

        storage.delete_object(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());
    }

    #[tokio::test]
    async fn memory_storage_delete_of_missing_key_errors() {
        let storage = MemoryStorage::default();
        assert!(storage.delete_object("nope").await.is_err());
    }
}
