use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, ImageError, ImageFormat};

use crate::config::ThumbnailConfig;
use crate::error::{PhotoError, PhotoResult};

/// Renders a thumbnail of the image at `src` into `dst`.
///
/// Implementations are CPU bound and are expected to be run off the
/// async runtime.
pub trait ThumbnailGenerator: Sync + Send + 'static {
    fn generate(&self, src: &Path, dst: &Path) -> PhotoResult<()>;
}

/// Produces fixed size JPEG thumbnails.
///
/// The output is always exactly `width` x `height`, the aspect ratio
/// of the source is not preserved.
#[derive(Debug, Clone, Copy)]
pub struct JpegThumbnailer {
    width: u32,
    height: u32,
    quality: u8,
}

impl JpegThumbnailer {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    pub fn from_config(cfg: &ThumbnailConfig) -> Self {
        Self::new(cfg.width, cfg.height, cfg.quality)
    }
}

impl ThumbnailGenerator for JpegThumbnailer {
    fn generate(&self, src: &Path, dst: &Path) -> PhotoResult<()> {
        let reader = BufReader::new(File::open(src)?);
        let img = image::io::Reader::with_format(reader, ImageFormat::Jpeg)
            .decode()
            .map_err(PhotoError::Decode)?;

        let thumb = img
            .resize_exact(self.width, self.height, FilterType::Lanczos3)
            .to_rgb8();

        let out = File::create(dst).map_err(|e| PhotoError::Encode(ImageError::IoError(e)))?;
        let mut writer = BufWriter::new(out);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode(thumb.as_raw(), thumb.width(), thumb.height(), ColorType::Rgb8)
            .map_err(PhotoError::Encode)?;

        writer
            .flush()
            .map_err(|e| PhotoError::Encode(ImageError::IoError(e)))?;

        debug!("Rendered {}x{} thumbnail @ {:?}", self.width, self.height, dst);
        Ok(())
    }
}
