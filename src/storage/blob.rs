use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use crate::constants::{
    AUDIO_CONTENT_TYPE, AUDIO_KEY_PREFIX, DEFAULT_FIREBASE_DOWNLOAD_URL, HTTP_REQUEST_TIMEOUT_SECS,
};

/// Object storage for synthesized audio
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `destination_key` and return a URL that anonymous
    /// clients can fetch
    async fn upload(&self, bytes: Vec<u8>, destination_key: &str) -> Result<String>;
}

/// Unique object key for one synthesized reply.
///
/// Nanosecond timestamp plus a random token, so concurrent uploads for the
/// same session never overwrite each other.
pub fn audio_object_key(owner_id: &str, entity_slug: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{}/{}/{}/{}-{}.mp3",
        AUDIO_KEY_PREFIX,
        owner_id,
        entity_slug,
        nanos,
        Uuid::new_v4().simple()
    )
}

/// Cloud Storage bucket fronted by Firebase download tokens
pub struct FirebaseBlobStore {
    client: Client,
    upload_base_url: String,
    download_base_url: String,
    bucket: String,
    access_token: Option<String>,
}

impl FirebaseBlobStore {
    pub fn new(
        upload_base_url: impl Into<String>,
        bucket: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            upload_base_url: upload_base_url.into().trim_end_matches('/').to_string(),
            download_base_url: DEFAULT_FIREBASE_DOWNLOAD_URL.to_string(),
            bucket: bucket.into(),
            access_token,
        })
    }

    /// Override the host used in returned download URLs
    pub fn with_download_base_url(mut self, url: impl Into<String>) -> Self {
        self.download_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn download_url(&self, key: &str, token: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}?alt=media&token={}",
            self.download_base_url,
            self.bucket,
            urlencoding::encode(key),
            token
        )
    }
}

#[async_trait]
impl BlobStore for FirebaseBlobStore {
    async fn upload(&self, bytes: Vec<u8>, destination_key: &str) -> Result<String> {
        let upload_url = format!("{}/upload/storage/v1/b/{}/o", self.upload_base_url, self.bucket);
        let response = self
            .authorize(self.client.post(&upload_url))
            .query(&[("uploadType", "media"), ("name", destination_key)])
            .header("Content-Type", AUDIO_CONTENT_TYPE)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to bucket {}", destination_key, self.bucket))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Storage upload error ({}): {}", status, error_text);
        }

        // The download token is the capability embedded in the public URL
        let token = Uuid::new_v4().to_string();
        let metadata_url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.upload_base_url,
            self.bucket,
            urlencoding::encode(destination_key)
        );
        let response = self
            .authorize(self.client.patch(&metadata_url))
            .json(&json!({
                "metadata": { "firebaseStorageDownloadTokens": token }
            }))
            .send()
            .await
            .with_context(|| format!("Failed to set download token on {}", destination_key))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Storage metadata error ({}): {}", status, error_text);
        }

        Ok(self.download_url(destination_key, &token))
    }
}

/// Directory-backed store for local runs
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl AsRef<Path>, public_base_url: impl Into<String>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create blob directory {}", root.display()))?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, bytes: Vec<u8>, destination_key: &str) -> Result<String> {
        if destination_key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            anyhow::bail!("Invalid blob key: {}", destination_key);
        }
        let path = self.root.join(destination_key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", path.display()))?;
        let encoded: Vec<_> = destination_key.split('/').map(urlencoding::encode).collect();
        Ok(format!("{}/{}", self.public_base_url, encoded.join("/")))
    }
}
