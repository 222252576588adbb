//! Image-layer sources: data URLs, bare base64, and local files.

use crate::core::errors::CoreError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Supplies decoded pixels for an image layer's `imageUrl`
pub trait ImageResolver: Sync {
    fn resolve(&self, url: &str) -> Result<RgbaImage, CoreError>;

    /// Hex digest that changes whenever `resolve(url)` could return other pixels
    fn source_digest(&self, url: &str) -> String {
        content_hash(url.as_bytes())
    }
}

/// Where an `imageUrl` points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// `data:<mime>;base64,<payload>`
    DataUrl(&'a str),
    /// `http(s)://` or `blob:` URL
    Remote(&'a str),
    /// Local file, optionally prefixed with `file://`
    File(&'a str),
}

impl<'a> ImageSource<'a> {
    pub fn classify(url: &'a str) -> Self {
        let trimmed = url.trim();
        if trimmed.starts_with("data:") {
            ImageSource::DataUrl(trimmed)
        } else if trimmed.starts_with("http://")
            || trimmed.starts_with("https://")
            || trimmed.starts_with("blob:")
        {
            ImageSource::Remote(trimmed)
        } else {
            ImageSource::File(trimmed.strip_prefix("file://").unwrap_or(trimmed))
        }
    }
}

/// Decode a data URL (any image MIME type) or a bare base64 string
pub fn decode_base64_or_data_url_to_bytes(value: &str) -> Result<Vec<u8>, CoreError> {
    let raw = if value.starts_with("data:") {
        let (header, payload) = value
            .split_once(',')
            .ok_or_else(|| CoreError::AssetLoad("Invalid data URL payload".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(CoreError::AssetLoad(
                "Only base64 data URLs are supported".to_string(),
            ));
        }
        payload
    } else {
        value
    };

    Ok(BASE64.decode(raw.trim())?)
}

pub fn encode_png_bytes_as_data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// Hex SHA-256 of a byte slice
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbaImage, CoreError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| CoreError::AssetLoad(format!("Failed to decode image: {}", err)))?;
    Ok(image.to_rgba8())
}

/// Resolves data URLs and local files; relative paths are taken from `base_dir`
#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    base_dir: Option<PathBuf>,
}

impl AssetResolver {
    pub const fn new() -> Self {
        Self { base_dir: None }
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageResolver for AssetResolver {
    fn resolve(&self, url: &str) -> Result<RgbaImage, CoreError> {
        match ImageSource::classify(url) {
            ImageSource::DataUrl(data) => {
                let bytes = decode_base64_or_data_url_to_bytes(data)?;
                decode_image_bytes(&bytes)
            }
            ImageSource::Remote(remote) => Err(CoreError::AssetLoad(format!(
                "Remote image sources are not fetched: {}",
                remote
            ))),
            ImageSource::File(path) => {
                let path = self.resolve_path(path);
                let bytes = std::fs::read(&path).map_err(|err| {
                    CoreError::AssetLoad(format!("{}: {}", path.display(), err))
                })?;
                decode_image_bytes(&bytes)
            }
        }
    }

    /// Local files are hashed by their bytes, so edits on disk are seen
    fn source_digest(&self, url: &str) -> String {
        match ImageSource::classify(url) {
            ImageSource::File(path) => {
                let path = self.resolve_path(path);
                match std::fs::read(&path) {
                    Ok(bytes) => content_hash(&bytes),
                    Err(_) => content_hash(format!("missing:{}", path.display()).as_bytes()),
                }
            }
            _ => content_hash(url.as_bytes()),
        }
    }
}
