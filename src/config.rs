//! Configuration for hplot.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.hplot/config.toml`
//! - Device timing constants and the plotter home position
//! - The pen-lift policy used when rewriting `PU` commands
//!
//! # Configuration File
//!
//! ```toml
//! [timing]
//! step_size = 0.025          # device units per motor step
//! pen_speed = 200.0          # device units per second
//! min_latency_us = 32000     # per-command controller time
//! init_delay_us = 2200000    # after IN;
//! default_delay_us = 150000  # after any other passthrough command
//!
//! # Default position for A4/Letter on a 7440A
//! [home]
//! x = 0
//! y = 7650
//!
//! [pen_up]
//! lift = "per-point"         # or "once"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::Point;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device timing
    pub timing: TimingConfig,
    /// Head position before the first command
    pub home: HomeConfig,
    /// `PU` rewriting
    pub pen_up: PenUpConfig,
}

/// Device timing constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub step_size: f64,
    pub pen_speed: f64,
    pub min_latency_us: u64,
    pub init_delay_us: u64,
    pub default_delay_us: u64,
}

impl TimingConfig {
    /// Transit time for one device unit, in microseconds
    pub fn unit_delay_us(&self) -> f64 {
        self.step_size / self.pen_speed * 1_000_000.0
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step_size: 0.025,
            pen_speed: 200.0,
            min_latency_us: 32_000,
            init_delay_us: 2_200_000,
            default_delay_us: 150_000,
        }
    }
}

/// Home position in device units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    pub x: i32,
    pub y: i32,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self { x: 0, y: 7650 }
    }
}

impl HomeConfig {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// When to send a bare `PU` while rewriting a multi-point `PU`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PenLiftPolicy {
    /// Before every absolute move
    #[default]
    PerPoint,
    /// Before the first move only
    Once,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenUpConfig {
    pub lift: PenLiftPolicy,
}

impl Config {
    /// Load configuration from `~/.hplot/config.toml`, falling back to
    /// defaults when it is missing or unusable
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (for `--dump-config`)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if !(t.step_size.is_finite() && t.step_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timing.step_size must be positive, got {}",
                t.step_size
            )));
        }
        if !(t.pen_speed.is_finite() && t.pen_speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timing.pen_speed must be positive, got {}",
                t.pen_speed
            )));
        }
        // Below 1 us per unit, rounding maps different distances to one delay
        if t.unit_delay_us() < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "timing.step_size / timing.pen_speed must give at least 1 us per unit, got {} us",
                t.unit_delay_us()
            )));
        }
        Ok(())
    }

    fn get_config_path() -> Option<PathBuf> {
        hplot_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.hplot`
pub fn hplot_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(|home| PathBuf::from(home).join(".hplot"))
}
