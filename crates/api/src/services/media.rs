//! Image uploads: Cloudinary when configured, otherwise the local
//! `uploads/` directory served at `/uploads`.

use std::path::PathBuf;

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::CloudinaryConfig;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Where an upload belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    ProfileImages,
    Products,
    Banners,
    Articles,
}

impl MediaFolder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProfileImages => "profile_images",
            Self::Products => "products",
            Self::Banners => "banners",
            Self::Articles => "articles",
        }
    }
}

/// A file received in a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Lower-case image extension, from the file name or else the content type.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UnsupportedType` if the file is not an accepted image.
    pub fn extension(&self) -> Result<&'static str, MediaError> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let from_type = self
            .content_type
            .as_deref()
            .and_then(|t| t.strip_prefix("image/"))
            .map(str::to_ascii_lowercase);

        from_name
            .into_iter()
            .chain(from_type)
            .find_map(|ext| ALLOWED_EXTENSIONS.iter().copied().find(|a| *a == ext))
            .ok_or(MediaError::UnsupportedType)
    }

    fn validate(&self) -> Result<&'static str, MediaError> {
        if self.bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(MediaError::TooLarge);
        }
        self.extension()
    }
}

/// Errors from storing an upload.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Image exceeds the 5 MB limit")]
    TooLarge,

    #[error("Only jpg, jpeg, png, webp and gif images are allowed")]
    UnsupportedType,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloudinary returned {status}: {body}")]
    Cloudinary { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether the client sent a bad file, as opposed to a storage failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Empty | Self::TooLarge | Self::UnsupportedType)
    }
}

/// Image storage backend.
#[derive(Clone)]
pub enum MediaStore {
    Cloudinary(CloudinaryUploader),
    Local(LocalStore),
}

impl MediaStore {
    /// Store an image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the file is rejected or storage fails.
    #[instrument(skip(self, upload), fields(size = upload.bytes.len(), folder = folder.as_str()))]
    pub async fn store(&self, upload: Upload, folder: MediaFolder) -> Result<String, MediaError> {
        let ext = upload.validate()?;
        let url = match self {
            Self::Cloudinary(uploader) => uploader.upload(upload, folder).await?,
            Self::Local(store) => store.write(&upload.bytes, folder, ext).await?,
        };
        tracing::info!(url = %url, "Image stored");
        Ok(url)
    }
}

// =============================================================================
// Cloudinary
// =============================================================================

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
}

/// Signed uploads to Cloudinary.
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryUploader {
    #[must_use]
    pub const fn new(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    async fn upload(&self, upload: Upload, folder: MediaFolder) -> Result<String, MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder.as_str()), ("timestamp", &timestamp)],
            self.config.api_secret.expose_secret(),
        );

        let mut part = reqwest::multipart::Part::bytes(upload.bytes);
        if let Some(name) = upload.file_name {
            part = part.file_name(name);
        }
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.as_str())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        );
        let response = self.client.post(url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Cloudinary {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<CloudinaryResponse>().await?.secure_url)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as a
/// query string, with the API secret appended, hashed with SHA-256.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable_by_key(|(k, _)| *k);
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(format!("{joined}{api_secret}")))
}

// =============================================================================
// Local
// =============================================================================

/// Files written under a directory served at `{base_url}/uploads`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    base_url: String,
}

impl LocalStore {
    #[must_use]
    pub const fn new(root: PathBuf, base_url: String) -> Self {
        Self { root, base_url }
    }

    async fn write(&self, bytes: &[u8], folder: MediaFolder, ext: &str) -> Result<String, MediaError> {
        let dir = self.root.join(folder.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        let name = format!("{}.{ext}", uuid::Uuid::new_v4());
        tokio::fs::write(dir.join(&name), bytes).await?;
        Ok(format!("{}/uploads/{}/{name}", self.base_url, folder.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: Option<&str>, content_type: Option<&str>, len: usize) -> Upload {
        Upload {
            file_name: name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn test_extension_from_name_or_type() {
        assert_eq!(upload(Some("Photo.JPG"), None, 1).extension().ok(), Some("jpg"));
        assert_eq!(upload(Some("blob"), Some("image/webp"), 1).extension().ok(), Some("webp"));
        assert!(matches!(
            upload(Some("notes.pdf"), Some("application/pdf"), 1).extension(),
            Err(MediaError::UnsupportedType)
        ));
    }

    #[test]
    fn test_validate_rejects_empty_and_oversized() {
        assert!(matches!(upload(Some("a.png"), None, 0).validate(), Err(MediaError::Empty)));
        assert!(matches!(
            upload(Some("a.png"), None, MAX_IMAGE_BYTES + 1).validate(),
            Err(MediaError::TooLarge)
        ));
        assert!(upload(Some("a.png"), None, MAX_IMAGE_BYTES).validate().is_ok());
    }

    #[test]
    fn test_sign_params_sorts_and_hashes() {
        let a = sign_params(&[("timestamp", "1700000000"), ("folder", "products")], "s3cr3t");
        let b = sign_params(&[("folder", "products"), ("timestamp", "1700000000")], "s3cr3t");
        assert_eq!(a, b);
        assert_eq!(
            a,
            hex::encode(Sha256::digest("folder=products&timestamp=1700000000s3cr3t"))
        );
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let root = std::env::temp_dir().join(format!("bazaar-media-{}", uuid::Uuid::new_v4()));
        let store = MediaStore::Local(LocalStore::new(root.clone(), "http://localhost:5000".to_string()));

        let url = store
            .store(upload(Some("x.png"), None, 3), MediaFolder::Banners)
            .await
            .expect("store");
        assert!(url.starts_with("http://localhost:5000/uploads/banners/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().expect("file name");
        let written = std::fs::read(root.join("banners").join(name)).expect("read back");
        assert_eq!(written.len(), 3);
        let _ = std::fs::remove_dir_all(root);
    }
}
