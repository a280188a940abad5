//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! confidence_threshold = 0.3
//! estimation_interval_ms = 33
//! poses = "poses.json"
//!
//! [overlays]
//! face_highlight = false
//!
//! [display]
//! width = 1280
//! height = 720
//!
//! [garments]
//! upper = "assets/shirt.png"
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Landmarks must score strictly above this to be drawn or used for garment placement.
    pub confidence_threshold: f32,
    /// Time between estimator invocations.
    pub estimation_interval_ms: u64,
    /// Recorded estimator output to replay.
    pub poses: Option<PathBuf>,
    pub overlays: Overlays,
    pub style: Style,
    pub display: Display,
    pub capture: Capture,
    pub garments: Garments,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            estimation_interval_ms: 33,
            poses: None,
            overlays: Overlays::default(),
            style: Style::default(),
            display: Display::default(),
            capture: Capture::default(),
            garments: Garments::default(),
        }
    }
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let mut config = Self::from_toml(&text)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Parses and validates a configuration from TOML source.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.confidence_threshold),
            "`confidence_threshold` must be in range 0.0 to 1.0, got {}",
            self.confidence_threshold
        );
        ensure!(
            self.estimation_interval_ms > 0,
            "`estimation_interval_ms` must be positive"
        );
        ensure!(
            self.display.refresh_rate > 0,
            "`display.refresh_rate` must be positive"
        );
        ensure!(
            self.display.width > 0 && self.display.height > 0,
            "display size must be positive, got {}x{}",
            self.display.width,
            self.display.height
        );
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut Option<PathBuf>| {
            if let Some(p) = path {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        };
        resolve(&mut self.poses);
        resolve(&mut self.capture.image);
        resolve(&mut self.garments.lower);
        resolve(&mut self.garments.upper);
    }

    pub fn estimation_interval(&self) -> Duration {
        Duration::from_millis(self.estimation_interval_ms)
    }
}

/// Which overlays to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overlays {
    pub keypoints: bool,
    pub skeleton: bool,
    pub face_highlight: bool,
    pub garments: bool,
}

impl Default for Overlays {
    fn default() -> Self {
        Self {
            keypoints: true,
            skeleton: true,
            face_highlight: true,
            garments: true,
        }
    }
}

/// Skeleton styling. Lengths marked as source pixels scale with the frame; the rest are surface
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub bone_width: u32,
    pub joint_radius: u32,
    pub joint_outline_width: u32,
    /// Length of the stub drawn below each ankle, in source pixels.
    pub ankle_stub: f32,
    /// Padding around the face landmarks, in source pixels.
    pub face_padding: f32,
    /// How far the face box is shifted upwards, as a fraction of its size.
    pub face_upward_bias: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            bone_width: 8,
            joint_radius: 6,
            joint_outline_width: 2,
            ankle_stub: 20.0,
            face_padding: 40.0,
            face_upward_bias: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Display {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            title: String::from("tryon"),
            width: 1280,
            height: 720,
            refresh_rate: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Capture {
    /// V4L2 device name to open. Falls back to `TRYON_WEBCAM_NAME`, then to the first usable
    /// device.
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    /// Use a still image instead of a webcam.
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Garments {
    pub lower: Option<PathBuf>,
    pub upper: Option<PathBuf>,
}
