use anyhow::{Context, Result};
use cadenza_core::{
    MachineConfig, config::EmissionMode, kinematics::delta::DeltaGeometry,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Main configuration for the Cadenza runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Machine limits and planning options
    #[serde(default)]
    pub machine: MachineConfig,

    /// Hardware boundary selection
    #[serde(default)]
    pub hal: HalConfig,
}

/// Which hardware boundary drives the machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HalConfig {
    /// Log every call and drain trajectories without moving anything
    #[default]
    Virtual,

    /// Write every motion event to a text file
    Export { path: PathBuf },

    /// Stream joint angles of a rotary delta robot
    Delta {
        #[serde(default)]
        geometry: DeltaGeometry,

        /// Model units per machine millimeter
        #[serde(default = "default_delta_scale")]
        scale: f64,

        /// Model position of the machine origin
        #[serde(default = "default_delta_origin")]
        origin: [f64; 3],

        /// Servo command stream, stdout when absent
        #[serde(default)]
        output: Option<PathBuf>,
    },
}

fn default_delta_scale() -> f64 {
    0.001
}

fn default_delta_origin() -> [f64; 3] {
    [-0.1, -0.1, -1.0]
}

impl Config {
    /// Load configuration from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let extension = path.extension().and_then(|s| s.to_str());

        match extension {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => {
                // Try TOML first (preferred), fall back to JSON
                Self::from_toml(&content).or_else(|_| Self::from_json(&content))
            }
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    /// Parse configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.machine.validate()?;

        match &self.hal {
            HalConfig::Virtual => {}
            HalConfig::Export { path } => {
                if path.as_os_str().is_empty() {
                    anyhow::bail!("hal.path cannot be empty");
                }
            }
            HalConfig::Delta {
                geometry, scale, ..
            } => {
                geometry.validate()?;
                if *scale <= 0.0 {
                    anyhow::bail!("hal.scale must be positive");
                }
                if self.machine.emission != EmissionMode::Samples {
                    anyhow::bail!("the delta boundary requires machine.emission = \"samples\"");
                }
            }
        }

        Ok(())
    }
}
