//! Static machine parameters.
//!
//! Every field has a default so a configuration file only needs to
//! name what differs from the reference machine.

use crate::{
    coordinates::{Axis, Coordinates},
    error::{MachineError, Result},
    kinematics::delta::DeltaGeometry,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Complete parameter table for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Maximum velocity per axis in mm/min
    #[serde(deserialize_with = "axis_table::max_velocity")]
    pub max_velocity_mm_per_min: Coordinates,

    /// Feed rates below this are rejected, mm/min
    pub min_velocity_mm_per_min: f64,

    /// Workspace extent from the machine origin, mm. E is unbounded.
    #[serde(deserialize_with = "axis_table::table_size")]
    pub table_size_mm: Coordinates,

    /// Acceleration shared by all axes, mm/s^2
    pub max_acceleration_mm_per_s2: f64,

    pub spindle_max_rpm: f64,

    /// Stepper resolution per axis
    #[serde(deserialize_with = "axis_table::steps_per_mm")]
    pub steps_per_mm: Coordinates,

    /// Direction inversion per axis
    pub inverted: InvertedAxes,

    /// What to do when a feed would exceed an axis maximum
    pub velocity_policy: VelocityPolicy,

    /// How trajectories are emitted to the hardware boundary
    pub emission: EmissionMode,

    /// Control period for sample emission, seconds
    pub sample_period_s: f64,

    /// Feed selection for rapid (G0) moves
    pub rapid_feed: RapidFeed,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_velocity_mm_per_min: Coordinates::new(24000.0, 12000.0, 600.0, 1500.0),
            min_velocity_mm_per_min: 1.0,
            table_size_mm: Coordinates::new(200.0, 200.0, 220.0, 0.0),
            max_acceleration_mm_per_s2: 3000.0,
            spindle_max_rpm: 10000.0,
            steps_per_mm: Coordinates::new(100.0, 100.0, 400.0, 150.0),
            inverted: InvertedAxes::default(),
            velocity_policy: VelocityPolicy::Scale,
            emission: EmissionMode::Pulses,
            sample_period_s: 1.0 / 25.0,
            rapid_feed: RapidFeed::LimitingAxis,
        }
    }
}

/// Per-axis tables where a file names only the axes it changes; the
/// rest keep the reference machine's values.
mod axis_table {
    use super::{Coordinates, Deserialize, Deserializer, MachineConfig};

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Overrides {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
    }

    fn merge<'de, D: Deserializer<'de>>(
        deserializer: D,
        base: Coordinates,
    ) -> Result<Coordinates, D::Error> {
        let o = Overrides::deserialize(deserializer)?;
        Ok(Coordinates::new(
            o.x.unwrap_or(base.x),
            o.y.unwrap_or(base.y),
            o.z.unwrap_or(base.z),
            o.e.unwrap_or(base.e),
        ))
    }

    pub(super) fn max_velocity<'de, D: Deserializer<'de>>(d: D) -> Result<Coordinates, D::Error> {
        merge(d, MachineConfig::default().max_velocity_mm_per_min)
    }

    pub(super) fn table_size<'de, D: Deserializer<'de>>(d: D) -> Result<Coordinates, D::Error> {
        merge(d, MachineConfig::default().table_size_mm)
    }

    pub(super) fn steps_per_mm<'de, D: Deserializer<'de>>(d: D) -> Result<Coordinates, D::Error> {
        merge(d, MachineConfig::default().steps_per_mm)
    }
}

/// Per-axis direction inversion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvertedAxes {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub e: bool,
}

impl InvertedAxes {
    pub fn get(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::E => self.e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VelocityPolicy {
    /// Scale the whole velocity vector down until every axis fits.
    Scale,
    /// Fail the move with a velocity limit error.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmissionMode {
    /// Timed step pulses for stepper drivers.
    Pulses,
    /// Absolute positions at a fixed control period.
    Samples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RapidFeed {
    /// Fastest feed at which no axis exceeds its maximum.
    LimitingAxis,
    /// Feed at which the axis with the largest travel reaches its
    /// maximum; the velocity policy handles any other axis overshoot.
    DominantAxis,
}

impl MachineConfig {
    /// Lower corner of the workspace box.
    pub fn workspace_min(&self) -> Coordinates {
        Coordinates::ZERO
    }

    pub fn workspace_max(&self) -> Coordinates {
        self.table_size_mm
    }

    /// Slowest of the per-axis maxima, the feed a fresh machine starts with.
    pub fn default_feed(&self) -> f64 {
        let v = self.max_velocity_mm_per_min;
        v.x.min(v.y).min(v.z).min(v.e)
    }

    pub fn validate(&self) -> Result<()> {
        for axis in Axis::ALL {
            if !positive(self.max_velocity_mm_per_min.get(axis)) {
                return Err(invalid(format!(
                    "max_velocity_mm_per_min.{} must be positive",
                    axis.letter().to_ascii_lowercase()
                )));
            }
            if !positive(self.steps_per_mm.get(axis)) {
                return Err(invalid(format!(
                    "steps_per_mm.{} must be positive",
                    axis.letter().to_ascii_lowercase()
                )));
            }
        }
        // E has no travel limit
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            if !positive(self.table_size_mm.get(axis)) {
                return Err(invalid(format!(
                    "table_size_mm.{} must be positive",
                    axis.letter().to_ascii_lowercase()
                )));
            }
        }
        if !positive(self.min_velocity_mm_per_min) {
            return Err(invalid("min_velocity_mm_per_min must be positive"));
        }
        if !positive(self.max_acceleration_mm_per_s2) {
            return Err(invalid("max_acceleration_mm_per_s2 must be positive"));
        }
        if !positive(self.sample_period_s) {
            return Err(invalid("sample_period_s must be positive"));
        }
        if !positive(self.spindle_max_rpm) {
            return Err(invalid("spindle_max_rpm must be positive"));
        }
        Ok(())
    }
}

impl DeltaGeometry {
    pub fn validate(&self) -> Result<()> {
        if !positive(self.shoulder) || !positive(self.forearm) {
            return Err(invalid("delta arm lengths must be positive"));
        }
        if !self.base_radius.is_finite() || !self.platform_radius.is_finite() {
            return Err(invalid("delta radii must be finite"));
        }
        if self.joint_min_deg.is_nan()
            || self.joint_max_deg.is_nan()
            || self.joint_min_deg >= self.joint_max_deg
        {
            return Err(invalid("delta joint_min_deg must be below joint_max_deg"));
        }
        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(reason: impl Into<String>) -> MachineError {
    MachineError::InvalidConfig {
        reason: reason.into(),
    }
}
