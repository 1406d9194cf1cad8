use std::path::{Path, PathBuf};

use anyhow::anyhow;
use serde::Deserialize;

use crate::storage::backends::DatabaseConfig;

#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    /// The record store the photo rows live in.
    pub database: DatabaseConfig,

    #[serde(default)]
    /// Where the original images and thumbnails are written.
    pub storage: StorageConfig,

    #[serde(default)]
    /// The thumbnail generated for every upload.
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    /// Restrictions applied to incoming uploads.
    pub uploads: UploadConfig,
}

impl RuntimeConfig {
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err(anyhow!(
                "thumbnail dimensions must be non-zero, got {}x{}",
                self.thumbnails.width,
                self.thumbnails.height,
            ));
        }

        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(anyhow!(
                "thumbnail quality must be between 1 and 100, got {}",
                self.thumbnails.quality,
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// The directory containing the `images` and `thumbnails` folders.
    ///
    /// It is also served as static content under `/static`.
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_thumbnail_size")]
    /// The width to resize thumbnails to.
    pub width: u32,

    #[serde(default = "default_thumbnail_size")]
    /// The height to resize thumbnails to.
    pub height: u32,

    #[serde(default = "default_quality")]
    /// The JPEG encoder quality from 1 to 100.
    ///
    /// Defaults to `75`.
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: default_thumbnail_size(),
            height: default_thumbnail_size(),
            quality: default_quality(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_extensions")]
    /// File extensions (without the leading dot) that may be uploaded.
    ///
    /// Matching is exact and case sensitive. Defaults to `["jpeg"]`.
    pub allowed_extensions: Vec<String>,
}

impl UploadConfig {
    pub fn is_allowed(&self, basename: &str) -> bool {
        Path::new(basename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.allowed_extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_extensions(),
        }
    }
}

const fn default_thumbnail_size() -> u32 {
    64
}

const fn default_quality() -> u8 {
    75
}

fn default_extensions() -> Vec<String> {
    vec!["jpeg".to_string()]
}
