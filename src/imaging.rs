//! Image I/O and resampling behind a small service trait.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::BeardError;

/// Capability the pipeline needs from an image backend.
pub trait ImageService {
    /// Reads any supported format as 8-bit RGB.
    fn read(&self, path: &Path) -> Result<RgbImage, BeardError>;

    /// Writes `image`; the format follows the path's extension.
    fn write(&self, path: &Path, image: &RgbImage) -> Result<(), BeardError>;

    /// Resamples `image` to exactly `width` x `height`.
    fn resize(&self, image: &RgbImage, width: u32, height: u32) -> RgbImage;
}

/// [`ImageService`] backed by the `image` crate, resizing bilinearly.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrate;

impl ImageService for ImageCrate {
    fn read(&self, path: &Path) -> Result<RgbImage, BeardError> {
        let image = image::open(path).map_err(|source| BeardError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(image.to_rgb8())
    }

    fn write(&self, path: &Path, image: &RgbImage) -> Result<(), BeardError> {
        image.save(path).map_err(|source| BeardError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    fn resize(&self, image: &RgbImage, width: u32, height: u32) -> RgbImage {
        if image.width() == width && image.height() == height {
            return image.clone();
        }
        imageops::resize(image, width, height, FilterType::Triangle)
    }
}

/// Image extensions picked up by the loader (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// True if `path` has one of [`IMAGE_EXTENSIONS`], ignoring case.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn write_then_read_png() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("dot.png");
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(2, 1, Rgb([200, 10, 30]));

        ImageCrate.write(&path, &image).expect("write");
        let back = ImageCrate.read(&path).expect("read");
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(2, 1), &Rgb([200, 10, 30]));
    }

    #[test]
    fn read_missing_file_is_image_error() {
        let err = ImageCrate.read(Path::new("/nonexistent/none.png")).unwrap_err();
        assert!(matches!(err, BeardError::ImageRead { .. }));
    }

    #[test]
    fn resize_hits_requested_dimensions() {
        let image = RgbImage::from_pixel(10, 20, Rgb([7, 7, 7]));
        let resized = ImageCrate.resize(&image, 5, 4);
        assert_eq!(resized.dimensions(), (5, 4));
        assert_eq!(resized.get_pixel(0, 0), &Rgb([7, 7, 7]));
    }

    #[test]
    fn image_extension_check_ignores_case() {
        assert!(is_image_file(Path::new("a/b/000001.JPG")));
        assert!(is_image_file(Path::new("x.png")));
        assert!(!is_image_file(Path::new("x.txt")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
