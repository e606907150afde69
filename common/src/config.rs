use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub watchtower: WatchtowerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub roi: RoiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchtowerConfig {
    #[serde(default = "default_watchtower_url")]
    pub url: String,
    /// Watchtower serves a self-signed certificate on localhost.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Frame rate requested from the watchtower stream endpoint.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Upper bound on a single JPEG part. Caps the parse buffer if the
    /// stream never produces the next multipart boundary.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoiConfig {
    /// Side of the centered square ROI as a fraction of the smaller
    /// frame dimension. Must be in (0, 1].
    #[serde(default = "default_roi_fraction")]
    pub fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default = "default_quit_key")]
    pub quit_key: char,
    /// Bounded key-press wait per cycle; also paces the loop.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for WatchtowerConfig {
    fn default() -> Self {
        Self {
            url: default_watchtower_url(),
            accept_invalid_certs: default_accept_invalid_certs(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            fraction: default_roi_fraction(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            quit_key: default_quit_key(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.roi.fraction > 0.0 && self.roi.fraction <= 1.0) {
            return Err(ConfigError::InvalidRoiFraction(self.roi.fraction));
        }
        if self.display.poll_timeout_ms == 0 {
            return Err(ConfigError::InvalidPollTimeout);
        }
        if self.stream.fps <= 0.0 {
            return Err(ConfigError::InvalidFps(self.stream.fps));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("roi.fraction must be in (0, 1], got {0}")]
    InvalidRoiFraction(f64),
    #[error("display.poll_timeout_ms must be greater than zero")]
    InvalidPollTimeout,
    #[error("stream.fps must be positive, got {0}")]
    InvalidFps(f64),
}

// Default value functions
fn default_watchtower_url() -> String {
    "https://localhost:4343".into()
}
fn default_accept_invalid_certs() -> bool {
    true
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_fps() -> f64 {
    15.0
}
fn default_max_frame_bytes() -> usize {
    8 * 1024 * 1024
}
fn default_roi_fraction() -> f64 {
    0.2
}
fn default_window_title() -> String {
    "Aperture Adjustment".into()
}
fn default_quit_key() -> char {
    'q'
}
fn default_poll_timeout_ms() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}
