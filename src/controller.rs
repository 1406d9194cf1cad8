use std::sync::Arc;

use poem_openapi::Object;
use tokio::io::AsyncRead;

use crate::error::{PhotoError, PhotoResult};
use crate::storage::template::{FileStore, RecordStore};

#[derive(Object, sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// The id assigned to the photo when it was stored.
    pub id: i64,

    /// The photo's file name.
    ///
    /// The original is served from `/static/images/{file}` and the
    /// thumbnail from `/static/thumbnails/{file}`.
    pub file: String,
}

/// Keeps the photo rows and the files backing them in step.
///
/// Neither store knows about the other, every change to a photo must
/// go through here.
pub struct PhotoController {
    records: Arc<dyn RecordStore>,
    files: Arc<dyn FileStore>,
}

impl PhotoController {
    pub fn new(records: Arc<dyn RecordStore>, files: Arc<dyn FileStore>) -> Self {
        Self { records, files }
    }

    /// Stores the files first and the row second.
    ///
    /// If the row cannot be written the files are removed again, so a
    /// returned error never leaves a row without files behind.
    pub async fn append(
        &self,
        basename: &str,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> PhotoResult<Photo> {
        if self.records.find_by_file(basename).await?.is_some() {
            return Err(PhotoError::Duplicate(basename.to_string()));
        }

        self.files.append(basename, data).await?;

        match self.records.append(basename).await {
            Ok(photo) => {
                info!("Stored photo {} as {:?}", photo.id, &photo.file);
                Ok(photo)
            },
            Err(e) => {
                if let Err(cleanup) = self.files.delete(basename).await {
                    warn!(
                        "Failed to remove files of {:?} after the record was rejected: {}",
                        basename, cleanup,
                    );
                }
                Err(e)
            },
        }
    }

    /// Removes the row and then the files.
    ///
    /// Returns `PhotoError::NotFound` without touching anything when no
    /// photo has the given id.
    pub async fn delete(&self, id: i64) -> PhotoResult<Photo> {
        let photo = self.records.find(id).await?;

        self.records.delete(id).await?;
        self.files.delete(&photo.file).await?;

        info!("Deleted photo {} ({:?})", photo.id, &photo.file);
        Ok(photo)
    }

    pub async fn find_all(&self) -> PhotoResult<Vec<Photo>> {
        self.records.find_all().await
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;
    use image::GenericImageView;

    use super::*;
    use crate::processor::JpegThumbnailer;
    use crate::storage::backends::filesystem::FileSystemBackend;
    use crate::storage::backends::sql::SqliteRecordStore;
    use crate::test_utils::TEST_IMAGE;

    /// A record store that accepts reads but refuses every insert.
    struct RejectingRecordStore;

    #[async_trait]
    impl RecordStore for RejectingRecordStore {
        async fn find(&self, id: i64) -> PhotoResult<Photo> {
            Err(PhotoError::NotFound(id))
        }

        async fn find_by_file(&self, _basename: &str) -> PhotoResult<Option<Photo>> {
            Ok(None)
        }

        async fn find_all(&self) -> PhotoResult<Vec<Photo>> {
            Ok(vec![])
        }

        async fn append(&self, _basename: &str) -> PhotoResult<Photo> {
            Err(PhotoError::Database(sqlx::Error::PoolClosed))
        }

        async fn delete(&self, _id: i64) -> PhotoResult<()> {
            Ok(())
        }
    }

    fn files(dir: &Path) -> Arc<FileSystemBackend> {
        Arc::new(FileSystemBackend::new(
            dir.to_path_buf(),
            Arc::new(JpegThumbnailer::new(64, 64, 75)),
        ))
    }

    async fn controller(dir: &Path) -> anyhow::Result<(PhotoController, Arc<FileSystemBackend>)> {
        let records = Arc::new(SqliteRecordStore::connect("sqlite::memory:", 1).await?);
        let files = files(dir);
        Ok((PhotoController::new(records, files.clone()), files))
    }

    #[tokio::test]
    async fn append_stores_row_and_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (controller, files) = controller(dir.path()).await?;

        let photo = controller.append("cat.jpeg", &mut TEST_IMAGE.as_slice()).await?;

        let listed = controller.find_all().await?;
        assert_eq!(listed, vec![photo]);
        assert!(files.image_path("cat.jpeg").exists());

        let thumb = image::open(files.thumbnail_path("cat.jpeg"))?;
        assert_eq!(thumb.dimensions(), (64, 64));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_record_removes_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let files = files(dir.path());
        let controller = PhotoController::new(Arc::new(RejectingRecordStore), files.clone());

        let err = controller
            .append("cat.jpeg", &mut TEST_IMAGE.as_slice())
            .await
            .unwrap_err();

        assert!(matches!(err, PhotoError::Database(_)), "got {:?}", err);
        assert!(!files.image_path("cat.jpeg").exists());
        assert!(!files.thumbnail_path("cat.jpeg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_upload_keeps_existing_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (controller, files) = controller(dir.path()).await?;

        controller.append("cat.jpeg", &mut TEST_IMAGE.as_slice()).await?;
        let err = controller
            .append("cat.jpeg", &mut &b"replacement"[..])
            .await
            .unwrap_err();

        assert!(matches!(err, PhotoError::Duplicate(_)), "got {:?}", err);
        assert_eq!(std::fs::read(files.image_path("cat.jpeg"))?, *TEST_IMAGE);
        assert!(files.thumbnail_path("cat.jpeg").exists());
        assert_eq!(controller.find_all().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn delete_unknown_id_changes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (controller, files) = controller(dir.path()).await?;
        let photo = controller.append("cat.jpeg", &mut TEST_IMAGE.as_slice()).await?;

        let err = controller.delete(photo.id + 1).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(controller.find_all().await?, vec![photo]);
        assert!(files.image_path("cat.jpeg").exists());
        assert!(files.thumbnail_path("cat.jpeg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn upload_then_delete_leaves_nothing_behind() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (controller, files) = controller(dir.path()).await?;
        assert!(controller.find_all().await?.is_empty());

        let photo = controller.append("cat.jpeg", &mut TEST_IMAGE.as_slice()).await?;
        let removed = controller.delete(photo.id).await?;

        assert_eq!(removed, photo);
        assert!(controller.find_all().await?.is_empty());
        assert!(!files.image_path("cat.jpeg").exists());
        assert!(!files.thumbnail_path("cat.jpeg").exists());
        assert!(controller.delete(photo.id).await.unwrap_err().is_not_found());
        Ok(())
    }
}
