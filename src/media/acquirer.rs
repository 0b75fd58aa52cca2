use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

use crate::app::{AdlogError, Result};
use crate::config::HttpConfig;
use crate::domain::StoredImage;
use crate::fetcher::build_client;
use crate::media::mime::{infer_extension, is_image_content_type};
use crate::media::{ImageAcquirer, LISTINGS_DIR};

pub struct HttpImageAcquirer {
    client: Client,
    media_root: PathBuf,
    max_bytes: u64,
}

impl HttpImageAcquirer {
    pub fn new(config: &HttpConfig, media_root: impl Into<PathBuf>) -> Result<Self> {
        let client = build_client(config, config.image_timeout())?;
        Ok(Self {
            client,
            media_root: media_root.into(),
            max_bytes: config.max_image_bytes,
        })
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    fn listings_dir(&self) -> PathBuf {
        self.media_root.join(LISTINGS_DIR)
    }

    /// Absolute location of a stored image. Only plain file names inside
    /// the listings directory are accepted.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let file_name = relative_path
            .strip_prefix(LISTINGS_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
            .ok_or_else(|| {
                AdlogError::InvalidInput(format!("not a listing image path: {}", relative_path))
            })?;

        Ok(self.listings_dir().join(file_name))
    }
}

#[async_trait]
impl ImageAcquirer for HttpImageAcquirer {
    async fn acquire(&self, image_url: &str) -> Result<StoredImage> {
        let url = Url::parse(image_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AdlogError::InvalidInput(format!(
                "unsupported image scheme: {}",
                url.scheme()
            )));
        }

        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdlogError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = header_str(&response, CONTENT_TYPE);
        if !content_type.as_deref().is_some_and(is_image_content_type) {
            return Err(AdlogError::NotAnImage(content_type));
        }

        let declared_len = header_str(&response, CONTENT_LENGTH).and_then(|v| v.parse::<u64>().ok());
        if declared_len.is_some_and(|len| len > self.max_bytes) {
            return Err(AdlogError::ImageTooLarge {
                limit: self.max_bytes,
            });
        }

        let ext = infer_extension(content_type.as_deref(), url.path());
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), ext);

        let dir = self.listings_dir();
        fs::create_dir_all(&dir).await?;
        let path = dir.join(&file_name);

        let mut file = File::create(&path).await?;
        let written = match write_body(&mut response, &mut file, self.max_bytes).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove partial image {}: {}", path.display(), remove_err);
                }
                return Err(e);
            }
        };

        tracing::debug!("Stored {} bytes from {} as {}", written, url, path.display());

        Ok(StoredImage {
            relative_path: format!("{}/{}", LISTINGS_DIR, file_name),
        })
    }

    async fn discard(&self, image: &StoredImage) -> Result<()> {
        let path = self.resolve(&image.relative_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Stream the body into `file` chunk by chunk, enforcing `limit`.
async fn write_body(response: &mut Response, file: &mut File, limit: u64) -> Result<u64> {
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        written += chunk.len() as u64;
        if written > limit {
            return Err(AdlogError::ImageTooLarge { limit });
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(written)
}
