use base64::{engine::general_purpose, Engine as _};
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};
use std::io::Cursor;
use std::path::Path;

/// Longest edge, in pixels, of an image sent to the vision model.
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

/// Holds the screenshot data
#[derive(Debug, Clone)]
pub struct ScreenshotResult {
    /// Raw RGBA8 pixel data
    pub image_data: Vec<u8>,
    /// Width of the image
    pub width: u32,
    /// Height of the image
    pub height: u32,
}

impl ScreenshotResult {
    /// Wrap raw RGBA8 pixels.
    pub fn from_rgba(image_data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            image_data,
            width,
            height,
        }
    }

    /// Decode an encoded image (PNG, JPEG, ...) into RGBA8 pixels.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::from_rgba(rgba.into_raw(), width, height))
    }

    /// Load an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::from_rgba(rgba.into_raw(), width, height))
    }

    /// Encode as PNG at the original size.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        self.to_png_resized(None)
    }

    /// Encode as PNG, downscaling so the longest edge is at most `max_dimension`.
    ///
    /// Aspect ratio is preserved, so percentage coordinates measured on the
    /// resized image apply unchanged to the original.
    pub fn to_png_resized(&self, max_dimension: Option<u32>) -> Result<Vec<u8>, image::ImageError> {
        let buffer = ImageBuffer::<Rgba<u8>, _>::from_raw(
            self.width,
            self.height,
            self.image_data.clone(),
        )
        .ok_or(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ),
        ))?;

        let longest = self.width.max(self.height);
        let buffer = match max_dimension {
            Some(max) if max > 0 && longest > max => {
                let scale = max as f64 / longest as f64;
                let w = ((self.width as f64 * scale).round() as u32).max(1);
                let h = ((self.height as f64 * scale).round() as u32).max(1);
                image::imageops::resize(&buffer, w, h, FilterType::Triangle)
            }
            _ => buffer,
        };

        let mut png = Vec::new();
        PngEncoder::new(Cursor::new(&mut png)).write_image(
            buffer.as_raw(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(png)
    }

    /// PNG-encode (downscaled to [`DEFAULT_MAX_DIMENSION`]) and base64 the result.
    pub fn to_base64_png(&self) -> Result<String, image::ImageError> {
        let png = self.to_png_resized(Some(DEFAULT_MAX_DIMENSION))?;
        Ok(general_purpose::STANDARD.encode(png))
    }
}
