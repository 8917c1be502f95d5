use crate::{Error, PixelGrid};
use std::convert::TryFrom;
use std::path::Path;

/// Helper type used to define the source of `ImageSource`'s data
#[derive(Clone)]
pub enum ImageSource<'a> {
    /// A raw buffer of image data, see `image::load_from_memory` for details
    /// on what is supported
    Memory(&'a [u8]),
    /// The path to an image to load from disk. The image format is inferred
    /// from the file extension, see `image::open` for details
    Path(&'a Path),
    /// An already loaded image that is passed directly to the session
    Image(image::DynamicImage),
}

impl<'a> ImageSource<'a> {
    pub fn from_path(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<image::DynamicImage> for ImageSource<'a> {
    fn from(img: image::DynamicImage) -> Self {
        Self::Image(img)
    }
}

impl<'a, S> From<&'a S> for ImageSource<'a>
where
    S: AsRef<Path> + 'a,
{
    fn from(path: &'a S) -> Self {
        Self::Path(path.as_ref())
    }
}

pub fn load_dynamic_image(src: ImageSource<'_>) -> Result<image::DynamicImage, image::ImageError> {
    match src {
        ImageSource::Memory(data) => image::load_from_memory(data),
        ImageSource::Path(path) => image::open(path),
        ImageSource::Image(img) => Ok(img),
    }
}

/// Loads an image as 8-bit luma, the intensities of which become the values
/// of the grid
pub(crate) fn load_pixels(src: ImageSource<'_>) -> Result<PixelGrid, Error> {
    let img = load_dynamic_image(src)?.to_luma8();

    if img.width() == 0 || img.height() == 0 {
        return Err(Error::EmptyImage {
            width: img.width(),
            height: img.height(),
            len: 0,
        });
    }

    PixelGrid::try_from(&img)
}

/// Rounds and clamps every value of the grid into an 8-bit luma image
pub(crate) fn to_luma(grid: &PixelGrid) -> image::GrayImage {
    let data = grid
        .as_slice()
        .iter()
        .map(|v| v.round().max(0.0).min(255.0) as u8)
        .collect();

    // the buffer always has width * height values
    image::GrayImage::from_raw(grid.width(), grid.height(), data)
        .unwrap_or_else(|| image::GrayImage::new(grid.width(), grid.height()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Dims;

    #[test]
    fn luma_round_trips_through_dynamic_images() {
        let img = image::GrayImage::from_raw(3, 1, vec![0, 128, 255]).unwrap();
        let grid = load_pixels(ImageSource::Image(image::DynamicImage::ImageLuma8(img))).unwrap();

        assert_eq!(grid.dims(), Dims::new(3, 1));
        assert_eq!(grid.as_slice(), &[0.0, 128.0, 255.0]);
    }

    #[test]
    fn color_images_are_converted_to_luma() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        let grid = load_pixels(image::DynamicImage::ImageRgb8(img).into()).unwrap();

        assert!(grid.as_slice().iter().all(|v| *v == 255.0));
    }

    #[test]
    fn output_is_clamped() {
        let grid = PixelGrid::from_vec(4, 1, vec![-3.0, 12.4, 12.6, 300.0]).unwrap();
        assert_eq!(to_luma(&grid).into_raw(), vec![0, 12, 13, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        assert!(matches!(
            load_pixels(ImageSource::Memory(&[1, 2, 3, 4])),
            Err(Error::Image(_))
        ));
    }
}
