//! Image uploads to the hosted media service.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::config::MediaConfig;

#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("failed to read image: {0}")]
    Io(String),
    #[error("image is empty")]
    Empty,
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("upload response has no secure_url")]
    MissingUrl,
}

/// An image selected for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, MediaError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::Io(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// Stores images and hands back their public URL.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, image: ImageUpload) -> Result<String, MediaError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Unsigned uploads to a Cloudinary-style endpoint.
#[derive(Debug, Clone)]
pub struct CloudinaryHost {
    http: Client,
    upload_url: String,
    cloud_name: String,
    upload_preset: String,
}

impl CloudinaryHost {
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("sportos-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            upload_url: config.upload_url(),
            cloud_name: config.cloud_name.clone(),
            upload_preset: config.upload_preset.clone(),
        })
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, image: ImageUpload) -> Result<String, MediaError> {
        if image.bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        let size = image.bytes.len();
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| MediaError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("cloud_name", self.cloud_name.clone());

        debug!(file = %image.file_name, size, "uploading image");
        let res = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MediaError::Timeout
                } else {
                    MediaError::Transport(e.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(MediaError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let url = res
            .json::<UploadResponse>()
            .await
            .map_err(|e| MediaError::Transport(e.to_string()))?
            .secure_url
            .filter(|url| !url.is_empty())
            .ok_or(MediaError::MissingUrl)?;

        info!(file = %image.file_name, url = %url, "image uploaded");
        Ok(url)
    }
}
