//! Headless driver settings
//!
//! Loaded from an optional JSON file, then overridden by command-line flags.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};

/// Which simulation the driver runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Packet router on a network graph
    #[default]
    Net,
    /// Endless lane runner
    Runner,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Net => "net",
            Variant::Runner => "runner",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "net" | "network" | "router" => Ok(Variant::Net),
            "runner" | "endless" => Ok(Variant::Runner),
            other => Err(format!("unknown variant `{other}` (expected `net` or `runner`)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(&'static str),
}

/// Driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub variant: Variant,
    /// Runner seed; picked at random when absent
    pub seed: Option<u32>,
    /// Simulated seconds before the driver stops
    pub seconds: f32,

    // === Stepping ===
    pub fixed_dt: f32,
    pub max_substeps: u32,
    /// Wall-clock length of one driver frame
    pub frame_seconds: f32,

    // === Data overrides ===
    /// Level JSON for the net variant (built-in network otherwise)
    pub level_path: Option<PathBuf>,
    /// Balance JSON for the chosen variant
    pub balance_path: Option<PathBuf>,

    // === Output ===
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Feed commands from the built-in autopilot
    pub autopilot: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            variant: Variant::Net,
            seed: None,
            seconds: 90.0,

            fixed_dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
            frame_seconds: 1.0 / 30.0,

            level_path: None,
            balance_path: None,

            log_level: "info".to_owned(),
            autopilot: true,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(SettingsError::Invalid("fixed_dt must be finite and > 0"));
        }
        if !(self.frame_seconds.is_finite() && self.frame_seconds > 0.0) {
            return Err(SettingsError::Invalid("frame_seconds must be finite and > 0"));
        }
        if !(self.seconds.is_finite() && self.seconds >= 0.0) {
            return Err(SettingsError::Invalid("seconds must be finite and >= 0"));
        }
        if self.max_substeps == 0 {
            return Err(SettingsError::Invalid("max_substeps must be at least 1"));
        }
        Ok(())
    }

    /// Number of driver frames needed to cover `seconds`
    pub fn frame_count(&self) -> u64 {
        (self.seconds / self.frame_seconds).ceil() as u64
    }
}
