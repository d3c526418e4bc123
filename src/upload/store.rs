use anyhow::{Context, Result};
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use std::{future::Future, path::Path};
use tokio::fs::File;
use tracing::debug;

/// Destination for line images.
pub trait ObjectStore: Send + Sync + 'static {
    /// Upload the local file at `path` under object `key`.
    fn upload(&self, path: &Path, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Public URL an uploaded `key` is served from.
    fn public_url(&self, key: &str) -> String;
}

/// `https://<bucket>.<host>/<key>`
pub fn object_url(bucket: &str, host: &str, key: &str) -> String {
    format!("https://{}.{}/{}", bucket, host.trim_matches('/'), key)
}

/// Open `path` for a streamed simple upload, sized from its metadata.
pub async fn open_media(path: &Path, key: &str) -> Result<(File, Media)> {
    let file = File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len();

    let mut media = Media::new(key.to_string());
    media.content_length = Some(len);
    Ok((file, media))
}

/// Google Cloud Storage bucket, authenticated with Application Default Credentials.
pub struct GcsStore {
    client: Client,
    bucket: String,
    host: String,
}

impl GcsStore {
    pub async fn connect(bucket: impl Into<String>, host: impl Into<String>) -> Result<Self> {
        let cfg = ClientConfig::default()
            .with_auth()
            .await
            .context("authenticating to GCS")?;
        Ok(Self {
            client: Client::new(cfg),
            bucket: bucket.into(),
            host: host.into(),
        })
    }
}

impl ObjectStore for GcsStore {
    async fn upload(&self, path: &Path, key: &str) -> Result<()> {
        let (file, media) = open_media(path, key).await?;
        let len = media.content_length;
        let req = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        // the file handle is the body; nothing is buffered up front
        self.client
            .upload_object(&req, file, &UploadType::Simple(media))
            .await
            .with_context(|| format!("uploading {} to bucket {}", key, self.bucket))?;

        debug!(object = %key, bytes = ?len, "uploaded to GCS");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(&self.bucket, &self.host, key)
    }
}
