//! JSON configuration for the motion detection daemon.
//!
//! Keys mirror the configuration files the daemon has always read, so
//! existing `conf.json` files keep working. The required keys carry no
//! defaults; the few optional ones only tune the Rust daemon.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when the config has no access token
pub const DROPBOX_TOKEN_ENV: &str = "DROPBOX_ACCESS_TOKEN";

/// Daemon configuration, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upload confirmed frames to Dropbox
    pub use_dropbox: bool,

    /// Dropbox app key
    pub dropbox_key: String,

    /// Dropbox app secret
    pub dropbox_secret: String,

    /// Remote folder for uploaded frames
    pub dropbox_base_path: String,

    /// Capture resolution as [width, height]
    pub resolution: [u32; 2],

    /// Capture frame rate, also the loop rate limit
    pub fps: u32,

    /// Seconds to let the sensor settle before the first frame is used
    pub camera_warmup_time: f64,

    /// Minimum per-pixel difference from the background to count as foreground
    pub delta_thresh: u8,

    /// Minimum contour area for a region to count as motion
    pub min_area: f64,

    /// Cooldown between confirmed motion events
    pub min_upload_seconds: f64,

    /// Consecutive qualifying frames needed to confirm motion
    pub min_motion_frames: u32,

    /// Show the annotated feed
    ///
    /// The preview window (`q` to quit) is only compiled in with the
    /// `window` feature (`cargo build --features window`). Without it the
    /// feed can still go to a v4l2loopback device with `--loopback`;
    /// otherwise this flag only logs a warning.
    pub show_video: bool,

    /// Frames are resized to this width before processing
    #[serde(default = "default_resize_width")]
    pub resize_width: u32,

    /// Pre-authorized Dropbox token; falls back to `DROPBOX_ACCESS_TOKEN`
    #[serde(default)]
    pub dropbox_access_token: Option<String>,

    /// Timeout for a single upload request
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_seconds: u64,

    /// Directory for temporary upload images (OS temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_resize_width() -> u32 {
    500
}

fn default_upload_timeout() -> u64 {
    30
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.validate_with_env(|key| std::env::var(key).ok())
    }

    fn validate_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.resolution[0] == 0 || self.resolution[1] == 0 {
            return Err(Error::Config(format!(
                "Resolution must be non-zero, got {}x{}",
                self.resolution[0], self.resolution[1]
            )));
        }

        if self.fps == 0 {
            return Err(Error::Config("fps must be greater than 0".to_string()));
        }

        if !self.camera_warmup_time.is_finite() || self.camera_warmup_time < 0.0 {
            return Err(Error::Config(format!(
                "camera_warmup_time must be a non-negative number of seconds, got {}",
                self.camera_warmup_time
            )));
        }

        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(Error::Config(format!(
                "min_area must be non-negative, got {}",
                self.min_area
            )));
        }

        if !self.min_upload_seconds.is_finite() || self.min_upload_seconds < 0.0 {
            return Err(Error::Config(format!(
                "min_upload_seconds must be non-negative, got {}",
                self.min_upload_seconds
            )));
        }

        if self.min_motion_frames == 0 {
            return Err(Error::Config(
                "min_motion_frames must be at least 1".to_string(),
            ));
        }

        if self.resize_width == 0 {
            return Err(Error::Config("resize_width must be greater than 0".to_string()));
        }

        if self.upload_timeout_seconds == 0 {
            return Err(Error::Config(
                "upload_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.use_dropbox && self.token_with_env(env).is_none() {
            return Err(Error::Config(format!(
                "use_dropbox is set but no dropbox_access_token is configured and {} is unset",
                DROPBOX_TOKEN_ENV
            )));
        }

        Ok(())
    }

    /// Capture width and height
    pub fn dimensions(&self) -> (u32, u32) {
        (self.resolution[0], self.resolution[1])
    }

    /// Dropbox access token from the config, else from the environment
    pub fn access_token(&self) -> Option<String> {
        self.token_with_env(|key| std::env::var(key).ok())
    }

    fn token_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.dropbox_access_token
            .clone()
            .or_else(|| env(DROPBOX_TOKEN_ENV))
            .filter(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "use_dropbox": false,
            "dropbox_key": "KEY",
            "dropbox_secret": "SECRET",
            "dropbox_base_path": "/motion",
            "resolution": [640, 480],
            "fps": 16,
            "camera_warmup_time": 2.5,
            "delta_thresh": 5,
            "min_area": 5000,
            "min_upload_seconds": 3,
            "min_motion_frames": 8,
            "show_video": true
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_required_keys() {
        let config = Config::from_json(&sample_json()).unwrap();
        assert!(!config.use_dropbox);
        assert_eq!(config.dimensions(), (640, 480));
        assert_eq!(config.fps, 16);
        assert_eq!(config.delta_thresh, 5);
        assert_eq!(config.min_motion_frames, 8);
        assert!(config.show_video);
    }

    #[test]
    fn test_optional_keys_default() {
        let config = Config::from_json(&sample_json()).unwrap();
        assert_eq!(config.resize_width, 500);
        assert_eq!(config.upload_timeout_seconds, 30);
        assert!(config.dropbox_access_token.is_none());
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let json = sample_json().replace("\"min_area\": 5000,", "");
        match Config::from_json(&json) {
            Err(Error::Config(msg)) => assert!(msg.contains("min_area")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            ("\"fps\": 16", "\"fps\": 0"),
            ("[640, 480]", "[0, 480]"),
            ("\"min_motion_frames\": 8", "\"min_motion_frames\": 0"),
            ("\"camera_warmup_time\": 2.5", "\"camera_warmup_time\": -1"),
            ("\"delta_thresh\": 5", "\"delta_thresh\": 300"),
        ];

        for (from, to) in cases {
            let json = sample_json().replace(from, to);
            assert!(Config::from_json(&json).is_err(), "Expected error for {}", to);
        }
    }

    #[test]
    fn test_dropbox_token_from_config() {
        let json = sample_json()
            .replace("\"use_dropbox\": false", "\"use_dropbox\": true")
            .replace(
                "\"show_video\": true",
                "\"show_video\": true, \"dropbox_access_token\": \"sl.abc\"",
            );
        let config = Config::from_json(&json).unwrap();
        assert_eq!(config.access_token().as_deref(), Some("sl.abc"));
    }

    fn dropbox_config_without_token() -> Config {
        let json = sample_json().replace("\"use_dropbox\": false", "\"use_dropbox\": true");
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_dropbox_without_token_is_rejected() {
        let config = dropbox_config_without_token();

        match config.validate_with_env(|_| None) {
            Err(Error::Config(msg)) => assert!(msg.contains(DROPBOX_TOKEN_ENV)),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_dropbox_token_is_rejected() {
        let mut config = dropbox_config_without_token();
        config.dropbox_access_token = Some("   ".to_string());

        assert!(matches!(
            config.validate_with_env(|_| None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_dropbox_token_from_environment() {
        let config = dropbox_config_without_token();
        let env = |key: &str| (key == DROPBOX_TOKEN_ENV).then(|| "sl.env".to_string());

        assert!(config.validate_with_env(env).is_ok());
        assert_eq!(config.token_with_env(env).as_deref(), Some("sl.env"));
    }
}
