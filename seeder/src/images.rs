/// Image materialisation
/// Copies remote images referenced by fixtures into the local upload directory
/// and hands back the public URL the application serves them under.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "gif", "avif"];

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Materialise `url` under `folder`. `None` means no processed image is
    /// available; callers decide what to fall back to.
    async fn process_image_url(&self, url: &str, folder: &str) -> Option<String>;
}

/// Downloads images into `upload_dir/<folder>/<sha256(url)>.<ext>`
pub struct LocalImageCache {
    client: reqwest::Client,
    upload_dir: PathBuf,
    public_base_url: String,
}

impl LocalImageCache {
    pub fn new(upload_dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        let client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        LocalImageCache {
            client,
            upload_dir: upload_dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn public_url(&self, folder: &str, file_name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, folder, file_name)
    }

    /// Already served by the application, nothing to download
    fn is_internal(&self, url: &str) -> bool {
        (url.starts_with('/') && !url.starts_with("//"))
            || (!self.public_base_url.is_empty() && url.starts_with(&self.public_base_url))
    }

    async fn cached_file(&self, dir: &Path, stem: &str) -> Option<String> {
        for ext in IMAGE_EXTENSIONS {
            let name = format!("{}.{}", stem, ext);
            if tokio::fs::metadata(dir.join(&name)).await.is_ok() {
                return Some(name);
            }
        }
        None
    }

    async fn download(&self, url: &str, dir: &Path, stem: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_lowercase());
        if let Some(ref content_type) = content_type {
            if !content_type.starts_with("image/") {
                return Err(format!("unexpected content type {}", content_type));
            }
        }

        let ext = extension_from_url(url)
            .or_else(|| content_type.as_deref().and_then(extension_from_content_type))
            .unwrap_or("jpg");

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read body: {}", e))?;
        if bytes.is_empty() {
            return Err("empty body".to_string());
        }

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;

        let file_name = format!("{}.{}", stem, ext);
        let partial = dir.join(format!("{}.part", stem));
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| format!("failed to write {}: {}", partial.display(), e))?;
        tokio::fs::rename(&partial, dir.join(&file_name))
            .await
            .map_err(|e| format!("failed to store {}: {}", file_name, e))?;

        Ok(file_name)
    }
}

#[async_trait]
impl ImageService for LocalImageCache {
    async fn process_image_url(&self, url: &str, folder: &str) -> Option<String> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        if self.is_internal(url) {
            return Some(url.to_string());
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warn!(url = %url, "Unsupported image URL scheme");
            return None;
        }

        let folder = folder.trim_matches('/');
        let dir = self.upload_dir.join(folder);
        let stem = url_digest(url);

        if let Some(file_name) = self.cached_file(&dir, &stem).await {
            debug!(url = %url, file = %file_name, "Image already cached");
            return Some(self.public_url(folder, &file_name));
        }

        match self.download(url, &dir, &stem).await {
            Ok(file_name) => {
                debug!(url = %url, file = %file_name, "Image downloaded");
                Some(self.public_url(folder, &file_name))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Image download failed");
                None
            }
        }
    }
}

/// Hex SHA-256 of the source URL, used as the cached file stem
pub fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

fn extension_from_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.iter().copied().find(|known| *known == ext)
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        assert_eq!(extension_from_url("https://cdn.x/a/b.PNG?w=200"), Some("png"));
        assert_eq!(extension_from_url("https://cdn.x/a/b.webp#frag"), Some("webp"));
        assert_eq!(extension_from_url("https://cdn.x/a/image"), None);
        assert_eq!(extension_from_url("https://cdn.x/a/file.txt"), None);
        assert_eq!(
            extension_from_content_type("image/jpeg; charset=binary"),
            Some("jpg")
        );
        assert_eq!(extension_from_content_type("text/html"), None);
    }

    #[test]
    fn test_digest_is_stable() {
        let a = url_digest("https://cdn.x/a.jpg");
        assert_eq!(a.len(), 64);
        assert_eq!(a, url_digest("https://cdn.x/a.jpg"));
        assert_ne!(a, url_digest("https://cdn.x/b.jpg"));
    }

    #[tokio::test]
    async fn test_internal_urls_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalImageCache::new(dir.path(), "/uploads");
        assert_eq!(
            cache.process_image_url("/uploads/comics/a.jpg", "comics").await,
            Some("/uploads/comics/a.jpg".to_string())
        );
        assert_eq!(cache.process_image_url("   ", "comics").await, None);
        assert_eq!(cache.process_image_url("ftp://x/a.jpg", "comics").await, None);
    }

    #[tokio::test]
    async fn test_cached_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://images.invalid/covers/one-piece.png";
        let folder = dir.path().join("comics");
        std::fs::create_dir_all(&folder).unwrap();
        let file_name = format!("{}.png", url_digest(url));
        std::fs::write(folder.join(&file_name), b"png").unwrap();

        let cache = LocalImageCache::new(dir.path(), "/uploads/");
        let processed = cache.process_image_url(url, "comics").await;
        assert_eq!(processed, Some(format!("/uploads/comics/{}", file_name)));
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalImageCache::new(dir.path(), "/uploads");
        let processed = cache
            .process_image_url("http://127.0.0.1:9/missing.jpg", "comics")
            .await;
        assert_eq!(processed, None);
        assert!(!dir.path().join("comics").exists());
    }
}
