pub mod thumbnail;

pub use thumbnail::{JpegThumbnailer, ThumbnailGenerator};
