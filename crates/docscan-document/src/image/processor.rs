// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, quarter-turn rotation, resize, and encode.
// Operates on in-memory images using the `image` crate.

use docscan_core::error::ScanError;
use docscan_core::{DocumentType, ImageSize};
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`
/// wrapping the result, enabling method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&photo)?
///     .rotate90()
///     .encode(DocumentType::Jpeg, 85)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ScanError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            ScanError::ImageDecode(format!("failed to open {}: {}", path.as_ref().display(), err))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScanError> {
        let img = image::load_from_memory(data)
            .map_err(|err| ScanError::ImageDecode(format!("failed to decode image: {}", err)))?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self { image: img })
    }

    /// Wrap an RGBA pixel buffer.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.image.width(), self.image.height())
    }

    /// Consume the processor and return 8-bit RGBA pixels.
    pub fn into_rgba8(self) -> RgbaImage {
        self.image.into_rgba8()
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Rotate 90 degrees clockwise. Width and height swap; lossless.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn rotate90(self) -> Self {
        debug!("Rotating image 90 degrees clockwise");
        Self {
            image: self.image.rotate90(),
        }
    }

    /// Rotate clockwise by `turns` quarter turns (any count, taken mod 4).
    pub fn rotate_quarter_turns(self, turns: u32) -> Self {
        let image = match turns % 4 {
            1 => self.image.rotate90(),
            2 => self.image.rotate180(),
            3 => self.image.rotate270(),
            _ => self.image,
        };
        Self { image }
    }

    /// Resize the image to exactly `width` x `height`, ignoring aspect ratio.
    ///
    /// Uses triangle (bilinear) filtering; meant for previews, not for the
    /// rectified document itself.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        let resized = self
            .image
            .resize_exact(width, height, image::imageops::FilterType::Triangle);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes (alpha preserved).
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ScanError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// JPEG has no alpha channel: transparent pixels keep their stored colour,
    /// which is black for pixels the rectifier left empty.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, ScanError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| ScanError::ImageEncode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode into `format`; `quality` applies to JPEG only.
    pub fn encode(&self, format: DocumentType, quality: u8) -> Result<Vec<u8>, ScanError> {
        let bytes = match format {
            DocumentType::Jpeg => self.to_jpeg_bytes(quality)?,
            DocumentType::Png => self.to_png_bytes()?,
        };
        debug!(?format, quality, bytes = bytes.len(), "Image encoded");
        Ok(bytes)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    ///
    /// Alpha is dropped for JPEG targets, which cannot store it.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), ScanError> {
        let is_jpeg = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentType::from_extension)
            == Some(DocumentType::Jpeg);
        let result = if is_jpeg {
            DynamicImage::ImageRgb8(self.image.to_rgb8()).save(path.as_ref())
        } else {
            self.image.save(path.as_ref())
        };
        result.map_err(|err| {
            ScanError::ImageEncode(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ScanError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ScanError::ImageEncode(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
