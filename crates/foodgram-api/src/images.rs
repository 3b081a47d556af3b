use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::ApiError;

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

const RECIPE_DIR: &str = "recipes";

/// Recipe images on local disk. Paths stored in the database are relative to
/// `root` and served under `/media`.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode a `data:image/<ext>;base64,<payload>` URL and write it to disk.
    /// Returns the stored relative path.
    pub async fn save_data_url(&self, data_url: &str) -> Result<String, ApiError> {
        let (ext, payload) = parse_data_url(data_url)?;

        // base64 expands by 4/3, so reject oversized payloads before decoding
        if payload.len() / 4 * 3 > MAX_IMAGE_SIZE + 2 {
            return Err(ApiError::PayloadTooLarge(MAX_IMAGE_SIZE));
        }
        let bytes = B64
            .decode(payload.trim())
            .map_err(|_| ApiError::validation("image is not valid base64"))?;
        if bytes.is_empty() {
            return Err(ApiError::validation("image is empty"));
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::PayloadTooLarge(MAX_IMAGE_SIZE));
        }

        let dir = self.root.join(RECIPE_DIR);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            error!("Failed to create media dir {}: {}", dir.display(), e);
            ApiError::Internal
        })?;

        let rel = format!("{}/{}.{}", RECIPE_DIR, Uuid::new_v4(), ext);
        let path = self.root.join(&rel);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            error!("Failed to write image {}: {}", path.display(), e);
            ApiError::Internal
        })?;

        Ok(rel)
    }

    /// Best-effort removal of a stored image.
    pub async fn remove(&self, rel: &str) {
        if rel.is_empty() || rel.contains("..") {
            return;
        }
        let path = self.root.join(rel);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove image {}: {}", path.display(), e);
        }
    }

    pub fn url(&self, rel: &str) -> String {
        format!("/media/{}", rel)
    }
}

/// Split a data URL into a file extension and its base64 payload.
fn parse_data_url(data_url: &str) -> Result<(&'static str, &str), ApiError> {
    let invalid = || ApiError::validation("image must be a base64 data URL");

    let rest = data_url.strip_prefix("data:image/").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;

    let ext = match mime.to_ascii_lowercase().as_str() {
        "png" => "png",
        "jpeg" | "jpg" => "jpg",
        "gif" => "gif",
        "webp" => "webp",
        other => {
            warn!("Rejected image type '{}'", other);
            return Err(ApiError::validation("unsupported image type"));
        }
    };
    Ok((ext, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_parse_data_url() {
        let url = format!("data:image/jpeg;base64,{}", PIXEL);
        let (ext, payload) = parse_data_url(&url).unwrap();
        assert_eq!(ext, "jpg");
        assert_eq!(payload, PIXEL);

        assert!(parse_data_url("data:image/svg+xml;base64,AAAA").is_err());
        assert!(parse_data_url("https://example.com/a.png").is_err());
        assert!(parse_data_url("data:image/png,AAAA").is_err());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());

        let rel = media
            .save_data_url(&format!("data:image/png;base64,{}", PIXEL))
            .await
            .unwrap();
        assert!(rel.starts_with("recipes/") && rel.ends_with(".png"));
        assert!(dir.path().join(&rel).exists());
        assert_eq!(media.url(&rel), format!("/media/{}", rel));

        media.remove(&rel).await;
        assert!(!dir.path().join(&rel).exists());
    }

    #[tokio::test]
    async fn test_rejects_bad_base64() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let err = media.save_data_url("data:image/png;base64,@@@@").await;
        assert!(matches!(err, Err(ApiError::Validation(_))));
    }
}
