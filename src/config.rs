// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Settings live in `<config_dir>/fitcheck/config.toml`. Every field has a
//! default, so a partial file (or no file at all) is valid. The feedback
//! credential is deliberately not part of the file; see [`Credential`].

use crate::backends::camera::types::{DevicePosition, FlashMode};
use crate::constants::{self, EncodingPreset};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const APP_DIR: &str = "fitcheck";
const CONFIG_FILE: &str = "config.toml";

/// Camera session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Position attached by `configure()`
    pub preferred_position: DevicePosition,
    /// Flash mode requested for each still capture
    pub flash: FlashMode,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            preferred_position: DevicePosition::Back,
            flash: FlashMode::Auto,
        }
    }
}

/// Encoding pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
    /// Lossy quality factor in `(0, 1]`
    pub quality: f32,
}

impl EncodingSettings {
    /// Settings for a named preset (square bound)
    pub fn from_preset(preset: EncodingPreset) -> Self {
        Self {
            max_width: preset.max_dimension(),
            max_height: preset.max_dimension(),
            quality: preset.quality(),
        }
    }
}

impl EncodingSettings {
    /// Reject values the encoder cannot honor; quality above 1 is clamped
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Parse(format!(
                "encoding bound {}x{} must be at least 1x1",
                self.max_width, self.max_height
            )));
        }
        if !self.quality.is_finite() || self.quality <= 0.0 {
            return Err(ConfigError::Parse(format!(
                "encoding quality {} is outside (0, 1]",
                self.quality
            )));
        }
        if self.quality > 1.0 {
            warn!(quality = self.quality, "Encoding quality above 1, clamping");
            self.quality = 1.0;
        }
        Ok(self)
    }
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self::from_preset(EncodingPreset::default())
    }
}

/// Feedback service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// API base URL; `/chat/completions` is appended
    pub endpoint: String,
    /// Model id sent in every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum critique length in tokens
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedbackSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            endpoint: constants::feedback::DEFAULT_ENDPOINT.to_string(),
            model: constants::feedback::DEFAULT_MODEL.to_string(),
            temperature: constants::feedback::DEFAULT_TEMPERATURE,
            max_tokens: constants::feedback::DEFAULT_MAX_TOKENS,
            timeout_secs: constants::feedback::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraSettings,
    pub encoding: EncodingSettings,
    pub feedback: FeedbackSettings,
}

/// Path of the config file in the user's config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Load the config from the default location, falling back to defaults
/// when the file does not exist
pub fn load() -> Result<Config, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => load_from_path(&path),
        _ => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Load the config from a specific file
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.encoding = config.encoding.validated()?;
    debug!(path = %path.display(), "Config loaded");
    Ok(config)
}

/// Write the config to a specific file, creating parent directories
pub fn save_to_path(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Config saved");
    Ok(())
}

/// Bearer credential for the feedback service
///
/// Supplied once at startup. An absent credential is a permanent condition
/// for the session: the feedback client short-circuits every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(Option<String>);

impl Credential {
    /// Wrap a key; blank keys count as missing
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.trim().is_empty() {
            Self(None)
        } else {
            Self(Some(key))
        }
    }

    /// No credential
    pub fn missing() -> Self {
        Self(None)
    }

    /// Read the first non-empty variable of
    /// [`CREDENTIAL_ENV_VARS`](crate::constants::feedback::CREDENTIAL_ENV_VARS)
    pub fn from_env() -> Self {
        constants::feedback::CREDENTIAL_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(Self::new)
            .find(Credential::is_present)
            .unwrap_or_default()
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    pub fn expose(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "Credential(<redacted>)"),
            None => write!(f, "Credential(<missing>)"),
        }
    }
}
