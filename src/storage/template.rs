use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::controller::Photo;
use crate::error::PhotoResult;

/// The relational side of a photo: one row per stored file.
#[async_trait]
pub trait RecordStore: Sync + Send + 'static {
    /// Fetches a single row, `PhotoError::NotFound` if the id is unknown.
    async fn find(&self, id: i64) -> PhotoResult<Photo>;

    async fn find_by_file(&self, basename: &str) -> PhotoResult<Option<Photo>>;

    /// All rows ordered by file name ascending.
    async fn find_all(&self) -> PhotoResult<Vec<Photo>>;

    async fn append(&self, basename: &str) -> PhotoResult<Photo>;

    /// Removes the row if it exists, a missing row is not an error.
    async fn delete(&self, id: i64) -> PhotoResult<()>;
}

/// The on-disk side of a photo: the original upload and its thumbnail.
#[async_trait]
pub trait FileStore: Sync + Send + 'static {
    async fn ensure_directories(&self) -> PhotoResult<()>;

    /// Streams `data` to the images directory and renders its thumbnail.
    ///
    /// If the thumbnail cannot be produced the original is removed again
    /// before the error is returned.
    async fn append(
        &self,
        basename: &str,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> PhotoResult<()>;

    /// Removes both files, files which are already gone are skipped.
    async fn delete(&self, basename: &str) -> PhotoResult<()>;
}
