use thiserror::Error;

pub type PhotoResult<T> = Result<T, PhotoError>;

/// Everything that can go wrong while storing, listing or removing photos.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("no photo exists with id {0}")]
    NotFound(i64),

    #[error("invalid file name {0:?}: {1}")]
    InvalidName(String, &'static str),

    #[error("a photo named {0:?} already exists")]
    Duplicate(String),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database rejected the operation: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PhotoError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Errors caused by what the client sent rather than by the server.
    #[inline]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidName(..))
    }
}
