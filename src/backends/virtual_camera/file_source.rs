// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for the software camera
//!
//! Stills come either from an image file on disk or from a generated test
//! pattern, so the whole capture path can run without camera hardware.

use crate::backends::camera::types::{BackendError, BackendResult, CapturedImage, DevicePosition};
use crate::constants::file_formats;
use std::path::Path;
use tracing::{debug, info};

/// Load a still from an image file, checking the extension first
pub fn load_still(path: &Path) -> BackendResult<CapturedImage> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if file_formats::is_image_extension(&extension) {
        load_image_as_frame(path)
    } else {
        Err(BackendError::Other(format!(
            "Unsupported file format: {}",
            extension
        )))
    }
}

/// Decode an image file into an RGBA still
pub fn load_image_as_frame(path: &Path) -> BackendResult<CapturedImage> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    info!(width, height, "Image loaded successfully");

    Ok(CapturedImage::from_rgba(width, height, rgba.into_raw()))
}

/// Generate a deterministic portrait test pattern
///
/// A vertical gradient with a centred silhouette band. The front camera gets
/// a warm tint and the back camera a cool one, so a position switch is
/// visible in the output.
pub fn test_pattern(width: u32, height: u32, position: DevicePosition) -> CapturedImage {
    debug!(width, height, %position, "Generating test pattern");

    let (tint_r, tint_b) = match position {
        DevicePosition::Front => (60u8, 0u8),
        DevicePosition::Back => (0u8, 60u8),
    };
    let band_start = width / 3;
    let band_end = width - width / 3;

    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        let shade = (y as u64 * 255 / u64::from(height.max(1))) as u8;
        for x in 0..width {
            let in_band = x >= band_start && x < band_end;
            let base = if in_band { 255 - shade } else { shade };
            data.push(base.saturating_add(tint_r));
            data.push(base / 2);
            data.push(base.saturating_add(tint_b));
            data.push(255);
        }
    }

    CapturedImage::from_rgba(width, height, data)
}
