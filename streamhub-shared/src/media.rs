/// Media storage
///
/// Avatars and cover images are stored through the [`MediaStore`] trait,
/// which takes the uploaded bytes and hands back a public URL. The core
/// never looks inside the blob.
///
/// [`DiskMediaStore`] content-addresses files by SHA-256 and shards them by
/// the first two hex characters:
///
/// ```text
/// {root}/{hash[0..2]}/{hash}.{ext}   ->   {public_base_url}/{hash[0..2]}/{hash}.{ext}
/// ```
///
/// Identical uploads land on the same path, so re-uploading a file is a
/// cheap overwrite.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

/// Error type for media storage
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A received upload
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Client-supplied file name, used only for its extension
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Stores a blob and returns its public URL
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, upload: MediaUpload) -> Result<String, MediaError>;
}

/// Local-disk media store
#[derive(Debug, Clone)]
pub struct DiskMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl DiskMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Directory the files live in, for static serving
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Relative path for a content hash: `{shard}/{hash}.{ext}`
    fn relative_path(hash: &str, ext: &str) -> String {
        let shard = if hash.len() >= 2 { &hash[0..2] } else { "_" };
        format!("{}/{}.{}", shard, hash, ext)
    }
}

/// Picks a safe extension from the file name, then the content type
fn extension_for(upload: &MediaUpload) -> String {
    let from_name = upload
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    if let Some(ext) = from_name {
        return ext;
    }

    match upload.content_type.as_deref() {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        _ => "bin",
    }
    .to_string()
}

#[async_trait]
impl MediaStore for DiskMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<String, MediaError> {
        if upload.data.is_empty() {
            return Err(MediaError::Empty);
        }

        let hash = hex::encode(Sha256::digest(&upload.data));
        let relative = Self::relative_path(&hash, &extension_for(&upload));
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &upload.data).await?;

        debug!(path = %path.display(), bytes = upload.data.len(), "Stored media");
        Ok(format!("{}/{}", self.public_base_url, relative))
    }
}
