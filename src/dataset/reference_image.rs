//! Reference images handed to the detection source.

use std::io::Cursor;

use image::metadata::Orientation;
use image::{DynamicImage, GrayImage, ImageDecoder, ImageReader};
use nalgebra::Vector2;

use super::error::DatasetError;

/// Orientation of the stored pixels relative to the upright card.
///
/// Only the four pure rotations are distinguished; mirrored EXIF variants
/// are treated as upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageOrientation {
    #[default]
    Up,
    /// Rotated 180°.
    Down,
    /// Rotated 90° counter-clockwise.
    Left,
    /// Rotated 90° clockwise.
    Right,
}

impl From<Orientation> for ImageOrientation {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Rotate180 => Self::Down,
            Orientation::Rotate270 => Self::Left,
            Orientation::Rotate90 => Self::Right,
            _ => Self::Up,
        }
    }
}

/// A known card image with its physical size.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub name: String,
    pub pixels: GrayImage,
    pub orientation: ImageOrientation,
    /// Physical (width, height) in metres. Height follows the pixel aspect ratio.
    pub physical_size: Vector2<f64>,
}

impl ReferenceImage {
    /// Decode an encoded photo (PNG, JPEG, ...) into a reference image.
    pub fn decode(name: &str, bytes: &[u8], physical_width: f64) -> Result<Self, DatasetError> {
        let decode_err = |source| DatasetError::Decode {
            name: name.to_string(),
            source,
        };

        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| decode_err(image::ImageError::IoError(e)))?
            .into_decoder()
            .map_err(decode_err)?;
        let orientation = decoder
            .orientation()
            .unwrap_or(Orientation::NoTransforms);
        let image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;

        Self::from_image(name, image, orientation.into(), physical_width)
    }

    /// Build from an already decoded image.
    pub fn from_image(
        name: &str,
        image: DynamicImage,
        orientation: ImageOrientation,
        physical_width: f64,
    ) -> Result<Self, DatasetError> {
        let pixels = image.to_luma8();
        let (w, h) = pixels.dimensions();
        if w == 0 || h == 0 {
            return Err(DatasetError::EmptyImage(name.to_string()));
        }

        // Quarter turns swap the displayed aspect ratio.
        let (display_w, display_h) = match orientation {
            ImageOrientation::Left | ImageOrientation::Right => (h, w),
            ImageOrientation::Up | ImageOrientation::Down => (w, h),
        };
        let physical_height = physical_width * display_h as f64 / display_w as f64;

        Ok(Self {
            name: name.to_string(),
            pixels,
            orientation,
            physical_size: Vector2::new(physical_width, physical_height),
        })
    }

    pub fn physical_width(&self) -> f64 {
        self.physical_size.x
    }

    pub fn physical_height(&self) -> f64 {
        self.physical_size.y
    }
}
