//! Media storage for uploaded images.
//!
//! Clients send images as base64 data URLs (`data:image/png;base64,...`). The API
//! layer decodes them into an [`EncodedImage`], a [`MediaStore`] persists the
//! bytes and hands back a relative media path, and only that path is stored in
//! the database. URLs are derived from the path when responses are built.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{Rng, distributions::Alphanumeric};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Length of the random part of stored file names.
const FILE_STEM_LENGTH: usize = 16;

/// A decoded image ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// File extension derived from the MIME subtype, e.g. `png`
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// Decodes a `data:image/<type>;base64,<payload>` string.
    ///
    /// # Errors
    /// Returns a validation error on `field` if the string is not an image data
    /// URL or the payload is not valid, non-empty base64.
    pub fn from_data_url(field: &str, data_url: &str) -> Result<Self> {
        let invalid = || Error::validation(field, "Upload a valid image.");

        let (mime, payload) = data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or_else(invalid)?;
        let subtype = mime.strip_prefix("image/").ok_or_else(invalid)?;
        if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        let extension = match subtype.to_ascii_lowercase().as_str() {
            "jpeg" => "jpg".to_string(),
            other => other.to_string(),
        };

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(invalid());
        }
        Ok(Self { extension, bytes })
    }
}

/// Where uploaded media lives.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `image` under `folder` and returns its relative media path.
    async fn save(&self, folder: &str, image: &EncodedImage) -> Result<String>;
    /// Removes a stored file. Removing a file that is already gone is not an error.
    async fn delete(&self, path: &str) -> Result<()>;
    /// Public URL of a stored media path.
    fn url(&self, path: &str) -> String;
}

/// Stores media as files below a root directory.
pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., `http://localhost:8000/media`)
    url_prefix: String,
}

impl LocalMediaStore {
    #[must_use]
    pub fn new(root_path: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Resolves a relative media path, refusing anything that could escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::validation("path", format!("Invalid media path '{path}'.")));
        }
        Ok(self.root_path.join(relative))
    }
}

fn random_stem() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FILE_STEM_LENGTH)
        .map(char::from)
        .collect()
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, folder: &str, image: &EncodedImage) -> Result<String> {
        let relative = format!("{folder}/{}.{}", random_stem(), image.extension);
        let target = self.resolve(&relative)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &image.bytes).await?;
        info!("Stored {} bytes at {}", image.bytes.len(), relative);
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                debug!("Removed media {}", path);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media {} was already missing", path);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.url_prefix, path)
    }
}
