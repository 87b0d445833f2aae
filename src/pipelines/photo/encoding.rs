// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding for upload
//!
//! Turns a captured still into a transmittable payload:
//!
//! ```text
//! CapturedImage → bound dimensions → JPEG at quality → base64
//! ```
//!
//! The transform is deterministic for identical input and configuration.
//! It is CPU bound, so callers on an async runtime should use
//! [`PhotoEncoder::encode_in_background`].

use crate::backends::camera::types::{CapturedImage, PixelFormat};
use crate::config::EncodingSettings;
use crate::constants::encoding::PAYLOAD_MIME;
use crate::errors::EncodeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, info};

/// Dimension bound and quality factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Lossy quality factor in `(0, 1]`
    pub quality: f32,
}

impl EncodingConfig {
    /// JPEG quality value (1-100)
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        EncodingSettings::default().into()
    }
}

impl From<EncodingSettings> for EncodingConfig {
    fn from(settings: EncodingSettings) -> Self {
        Self {
            max_width: settings.max_width,
            max_height: settings.max_height,
            quality: settings.quality,
        }
    }
}

/// Output size for a source fitted inside `max_width` x `max_height`
///
/// Aspect ratio is preserved and images are never upscaled.
pub fn target_dimensions(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (src_width, src_height);
    }

    let scale = (max_width as f64 / src_width as f64)
        .min(max_height as f64 / src_height as f64)
        .min(1.0);

    let fit = |side: u32, max: u32| ((side as f64 * scale).round() as u32).clamp(1, max.max(1));
    (fit(src_width, max_width), fit(src_height, max_height))
}

/// Encoded image ready for the feedback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Base64 of the compressed bytes
    pub data: String,
    pub width: u32,
    pub height: u32,
    /// JPEG quality the bytes were produced with
    pub quality: u8,
    /// Size of the compressed bytes before base64
    pub compressed_len: usize,
}

impl EncodedPayload {
    /// `data:` URL embedding the payload
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", PAYLOAD_MIME, self.data)
    }
}

/// Photo encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoEncoder {
    config: EncodingConfig,
}

impl PhotoEncoder {
    pub fn new(config: EncodingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> EncodingConfig {
        self.config
    }

    /// Resize and compress without base64
    ///
    /// # Returns
    /// * `Ok((bytes, width, height))` - JPEG bytes and output dimensions
    /// * `Err(EncodeError)` - Empty source, short buffer, or encoder failure
    pub fn compress(&self, image: &CapturedImage) -> Result<(Vec<u8>, u32, u32), EncodeError> {
        if image.is_empty() {
            return Err(EncodeError::EmptySource);
        }

        let rgb = to_rgb(image)?;
        let (width, height) = target_dimensions(
            image.width,
            image.height,
            self.config.max_width,
            self.config.max_height,
        );

        let rgb = if (width, height) == (image.width, image.height) {
            rgb
        } else {
            debug!(
                from_width = image.width,
                from_height = image.height,
                width,
                height,
                "Resizing for upload"
            );
            imageops::resize(&rgb, width, height, FilterType::Triangle)
        };

        let mut buffer = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut buffer,
            self.config.jpeg_quality(),
        );
        encoder
            .encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| EncodeError::Compression(format!("JPEG encoding failed: {}", e)))?;

        if buffer.is_empty() {
            return Err(EncodeError::Compression(
                "encoder produced no output".to_string(),
            ));
        }

        Ok((buffer, width, height))
    }

    /// Produce the base64 payload for `image`
    pub fn encode(&self, image: &CapturedImage) -> Result<EncodedPayload, EncodeError> {
        let (bytes, width, height) = self.compress(image)?;
        let payload = EncodedPayload {
            data: STANDARD.encode(&bytes),
            width,
            height,
            quality: self.config.jpeg_quality(),
            compressed_len: bytes.len(),
        };

        info!(
            width,
            height,
            quality = payload.quality,
            compressed = payload.compressed_len,
            encoded = payload.data.len(),
            "Photo encoded for upload"
        );
        Ok(payload)
    }

    /// Encode on the blocking pool so the caller's runtime stays responsive
    pub async fn encode_in_background(
        &self,
        image: Arc<CapturedImage>,
    ) -> Result<EncodedPayload, EncodeError> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode(&image))
            .await
            .map_err(|e| EncodeError::Task(format!("Encoding task error: {}", e)))?
    }
}

/// Convert the captured pixels to packed RGB
fn to_rgb(image: &CapturedImage) -> Result<RgbImage, EncodeError> {
    let pixels = image.packed_pixels().ok_or_else(|| {
        EncodeError::InvalidBuffer(format!(
            "{} bytes is too short for {}x{} {:?} with stride {}",
            image.byte_size(),
            image.width,
            image.height,
            image.format,
            image.stride
        ))
    })?;

    let short = || EncodeError::InvalidBuffer("pixel buffer does not match dimensions".to_string());
    let rgb = match image.format {
        PixelFormat::RGBA => {
            let rgba = RgbaImage::from_raw(image.width, image.height, pixels).ok_or_else(short)?;
            DynamicImage::ImageRgba8(rgba).to_rgb8()
        }
        PixelFormat::RGB24 => RgbImage::from_raw(image.width, image.height, pixels).ok_or_else(short)?,
        PixelFormat::Gray8 => {
            let gray = GrayImage::from_raw(image.width, image.height, pixels).ok_or_else(short)?;
            DynamicImage::ImageLuma8(gray).to_rgb8()
        }
    };
    Ok(rgb)
}
