use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use crate::error::PhotoResult;
use crate::processor::ThumbnailGenerator;
use crate::storage::template::FileStore;
use crate::storage::validate_basename;

/// Keeps originals in `{directory}/images` and thumbnails in
/// `{directory}/thumbnails`, both keyed by the photo's basename.
pub struct FileSystemBackend {
    images: PathBuf,
    thumbnails: PathBuf,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
}

impl FileSystemBackend {
    pub fn new(dir: PathBuf, thumbnailer: Arc<dyn ThumbnailGenerator>) -> Self {
        Self {
            images: dir.join("images"),
            thumbnails: dir.join("thumbnails"),
            thumbnailer,
        }
    }

    #[inline]
    pub fn image_path(&self, basename: &str) -> PathBuf {
        self.images.join(basename)
    }

    #[inline]
    pub fn thumbnail_path(&self, basename: &str) -> PathBuf {
        self.thumbnails.join(basename)
    }

    async fn write_stream(
        &self,
        path: &Path,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> std::io::Result<()> {
        let mut file = match fs::File::create(path).await {
            Ok(file) => file,
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.images).await?;
                fs::File::create(path).await?
            },
            Err(other) => return Err(other),
        };

        tokio::io::copy(data, &mut file).await?;
        file.flush().await?;
        Ok(())
    }

    async fn render_thumbnail(&self, src: PathBuf, dst: PathBuf) -> PhotoResult<()> {
        fs::create_dir_all(&self.thumbnails).await?;

        let thumbnailer = self.thumbnailer.clone();
        tokio::task::spawn_blocking(move || thumbnailer.generate(&src, &dst)).await?
    }
}

/// Removes a file ignoring the case where it does not exist.
async fn purge(path: &Path) -> std::io::Result<()> {
    debug!("Purging file @ {:?}", path);
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(other) => Err(other),
    }
}

/// Cleanup after a failed step, failures here are only logged so the
/// original error reaches the caller.
async fn purge_quietly(path: &Path) {
    if let Err(e) = purge(path).await {
        warn!("Failed to clean up {:?} after a failed upload: {}", path, e);
    }
}

#[async_trait]
impl FileStore for FileSystemBackend {
    async fn ensure_directories(&self) -> PhotoResult<()> {
        fs::create_dir_all(&self.images).await?;
        fs::create_dir_all(&self.thumbnails).await?;
        Ok(())
    }

    async fn append(
        &self,
        basename: &str,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> PhotoResult<()> {
        validate_basename(basename)?;

        let path = self.image_path(basename);
        let staging = self.images.join(format!(".{}.part", Uuid::new_v4()));

        debug!("Storing image @ {:?}", &path);
        if let Err(e) = self.write_stream(&staging, data).await {
            purge_quietly(&staging).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&staging, &path).await {
            purge_quietly(&staging).await;
            return Err(e.into());
        }

        let thumbnail = self.thumbnail_path(basename);
        if let Err(e) = self.render_thumbnail(path.clone(), thumbnail.clone()).await {
            purge_quietly(&path).await;
            purge_quietly(&thumbnail).await;
            return Err(e);
        }

        Ok(())
    }

    async fn delete(&self, basename: &str) -> PhotoResult<()> {
        validate_basename(basename)?;

        purge(&self.image_path(basename)).await?;
        purge(&self.thumbnail_path(basename)).await?;
        Ok(())
    }
}
