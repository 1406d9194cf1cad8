use std::io::Cursor;

use image::{ImageBuffer, ImageOutputFormat, Rgb};
use once_cell::sync::Lazy;

/// A small gradient JPEG used as upload fixture throughout the tests.
pub static TEST_IMAGE: Lazy<Vec<u8>> = Lazy::new(|| {
    let img = ImageBuffer::from_fn(160, 120, |x, y| Rgb([(x % 256) as u8, (y * 2 % 256) as u8, 128]));

    let mut buff = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buff, ImageOutputFormat::Jpeg(90))
        .expect("encode test fixture");
    buff.into_inner()
});
