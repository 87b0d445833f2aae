// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// Upload size presets for the encoding pipeline
///
/// A preset bundles the dimension bound and the lossy quality factor.
/// Smaller payloads upload faster and cost fewer tokens; larger ones give
/// the model more detail to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPreset {
    /// Small payload, coarse detail
    Low,
    /// Balanced payload (default)
    #[default]
    Standard,
    /// Large payload, fine detail
    High,
}

impl EncodingPreset {
    /// Get all preset variants for iteration
    pub const ALL: [EncodingPreset; 3] = [
        EncodingPreset::Low,
        EncodingPreset::Standard,
        EncodingPreset::High,
    ];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            EncodingPreset::Low => "Low",
            EncodingPreset::Standard => "Standard",
            EncodingPreset::High => "High",
        }
    }

    /// Longest edge of the encoded image, in pixels
    pub fn max_dimension(&self) -> u32 {
        match self {
            EncodingPreset::Low => 512,
            EncodingPreset::Standard => encoding::DEFAULT_MAX_DIMENSION,
            EncodingPreset::High => 1024,
        }
    }

    /// Lossy quality factor in `(0, 1]`
    pub fn quality(&self) -> f32 {
        match self {
            EncodingPreset::Low => 0.4,
            EncodingPreset::Standard => encoding::DEFAULT_QUALITY,
            EncodingPreset::High => 0.7,
        }
    }
}

/// Encoding pipeline defaults
pub mod encoding {
    /// Default bound for both width and height
    pub const DEFAULT_MAX_DIMENSION: u32 = 768;

    /// Default lossy quality factor
    pub const DEFAULT_QUALITY: f32 = 0.5;

    /// MIME type of the encoded payload
    pub const PAYLOAD_MIME: &str = "image/jpeg";
}

/// Feedback service defaults
pub mod feedback {
    /// Chat completions API base URL
    pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

    /// Vision-capable model id
    pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

    /// Sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Upper bound on the critique length, in tokens
    pub const DEFAULT_MAX_TOKENS: u32 = 300;

    /// Request timeout
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Environment variables consulted for the bearer credential, in order
    pub const CREDENTIAL_ENV_VARS: &[&str] = &["FITCHECK_API_KEY", "OPENAI_API_KEY"];

    /// Maximum number of characters of a malformed body kept for diagnostics
    pub const MALFORMED_SNIPPET_CHARS: usize = 200;
}

/// Prompt text sent with every request
pub mod prompt {
    /// Version tag of the request shape and prompt text
    pub const REQUEST_SHAPE_VERSION: u32 = 1;

    /// System instruction fixing the assistant's persona
    pub const SYSTEM_PERSONA: &str = "You are a fashion assistant";

    /// User instruction preceding the image data
    pub const USER_INSTRUCTION: &str = "You are an impartial assistant that evaluates the outfit of the person in the focus of the image. Please provide feedback in the following format:\n\nRating: [Provide a rating from 0-10 for the outfit]\nFeedback: [Provide justification in 2 sentences for the rating, with suggestions for improvement]";

    /// Lead-in placed between the instruction and the data URL
    pub const IMAGE_LEAD_IN: &str = "Here's the image data (base64):";
}

/// Photo collection constants
pub mod gallery {
    /// Lowest rating a photo can hold
    pub const MIN_RATING: u8 = 0;

    /// Highest rating a photo can hold
    pub const MAX_RATING: u8 = 10;

    /// Critique text shown when no feedback could be obtained
    pub const FEEDBACK_PLACEHOLDER: &str = "No feedback available for this photo.";
}

/// Timing constants
pub mod timing {
    /// Simulated shutter latency of the software camera
    pub const VIRTUAL_CAPTURE_LATENCY_MS: u64 = 120;

    /// Capacity of the session event broadcast channel
    pub const SESSION_EVENT_CAPACITY: usize = 64;

    /// Capacity of the pipeline event channel
    pub const PIPELINE_EVENT_CAPACITY: usize = 32;
}

/// Supported file formats for the software camera source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
