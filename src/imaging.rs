//! Image decoding and width-constrained resizing.
//!
//! Main images are decoded to report their pixel dimensions; thumbnails and
//! main-image previews are scaled to a fixed width, keeping aspect ratio,
//! and re-encoded as PNG for the presentation layer.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;

/// Width of navigation and panel thumbnails in pixels.
pub const THUMBNAIL_WIDTH: u32 = 120;

/// Width of the main-image preview in pixels.
pub const MAIN_PREVIEW_WIDTH: u32 = 450;

/// Errors from decoding or re-encoding image bytes.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Bytes are not a decodable image.
    #[error("cannot decode image: {reason}")]
    Decode {
        /// Decoder message.
        reason: String,
    },

    /// Resized image could not be encoded.
    #[error("cannot encode image: {reason}")]
    Encode {
        /// Encoder message.
        reason: String,
    },

    /// Requested target width is zero.
    #[error("target width must be positive")]
    ZeroWidth,
}

/// A resized, PNG-encoded rendition of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledImage {
    /// PNG bytes of the resized image.
    pub png: Vec<u8>,
    /// Width after resizing.
    pub width: u32,
    /// Height after resizing.
    pub height: u32,
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes).map_err(|e| ImageError::Decode {
        reason: e.to_string(),
    })
}

/// Decodes `bytes` and returns `(width, height)`.
///
/// # Errors
///
/// Returns [`ImageError::Decode`] if the bytes are not a supported image.
pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    Ok(decode(bytes)?.dimensions())
}

/// Height that keeps the aspect ratio when scaling `(w, h)` to `target_width`.
#[must_use]
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let scaled = u64::from(height) * u64::from(target_width) / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Decodes `bytes`, scales to `target_width` and encodes as PNG.
///
/// # Errors
///
/// Returns [`ImageError`] if the width is zero or decoding/encoding fails.
pub fn resize_to_width(bytes: &[u8], target_width: u32) -> Result<ScaledImage, ImageError> {
    if target_width == 0 {
        return Err(ImageError::ZeroWidth);
    }
    let img = decode(bytes)?;
    let (w, h) = img.dimensions();
    let target_height = scaled_height(w, h, target_width);
    let resized = img.resize_exact(target_width, target_height, FilterType::Triangle);

    let mut png = Cursor::new(Vec::new());
    resized
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ImageError::Encode {
            reason: e.to_string(),
        })?;

    Ok(ScaledImage {
        png: png.into_inner(),
        width: target_width,
        height: target_height,
    })
}
