use crate::coordinates::{Axis, Coordinates};
use thiserror::Error;

/// Broad classes of failure. Everything except `Geometry` and
/// `Hardware` is raised before any hardware call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    VelocityLimit,
    Geometry,
    Calibration,
    Hardware,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    #[error("target {target} is outside the workspace")]
    OutOfBounds { target: Coordinates },

    #[error("feed rate {feed} mm/min is below the minimum of {min} mm/min")]
    FeedTooLow { feed: f64, min: f64 },

    #[error("dwell requires a P parameter")]
    MissingDwell,

    #[error("dwell of {seconds}s is negative")]
    NegativeDwell { seconds: f64 },

    #[error("dwell of {seconds}s is too long")]
    DwellTooLong { seconds: f64 },

    #[error("unsupported command {code}")]
    UnknownCommand { code: String },

    #[error("relative positioning is not supported")]
    RelativeMode,

    #[error("spindle speed {rpm} rpm is outside 0..={max}")]
    SpindleSpeed { rpm: f64, max: f64 },

    #[error("malformed command on line {line}: {reason}")]
    MalformedCommand { line: usize, reason: String },

    #[error("expected {expected} components, got {actual}")]
    InvalidShape { expected: usize, actual: usize },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("axis {axis} velocity {requested:.3} mm/min exceeds maximum {max} mm/min")]
    VelocityLimit {
        axis: Axis,
        requested: f64,
        max: f64,
    },

    #[error("position {position} is kinematically unreachable")]
    Unreachable { position: Coordinates },

    #[error("homing finished but endstops for {axes} did not trigger")]
    Calibration { axes: String },

    #[error("hardware boundary failure: {reason}")]
    Hardware { reason: String },
}

impl MachineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MachineError::OutOfBounds { .. }
            | MachineError::FeedTooLow { .. }
            | MachineError::MissingDwell
            | MachineError::NegativeDwell { .. }
            | MachineError::DwellTooLong { .. }
            | MachineError::UnknownCommand { .. }
            | MachineError::RelativeMode
            | MachineError::SpindleSpeed { .. }
            | MachineError::MalformedCommand { .. }
            | MachineError::InvalidShape { .. }
            | MachineError::InvalidConfig { .. } => ErrorKind::Validation,
            MachineError::VelocityLimit { .. } => ErrorKind::VelocityLimit,
            MachineError::Unreachable { .. } => ErrorKind::Geometry,
            MachineError::Calibration { .. } => ErrorKind::Calibration,
            MachineError::Hardware { .. } => ErrorKind::Hardware,
        }
    }

    /// Wrap an I/O failure from a boundary implementation.
    pub fn hardware(err: impl std::fmt::Display) -> Self {
        MachineError::Hardware {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MachineError {
    fn from(err: std::io::Error) -> Self {
        MachineError::hardware(err)
    }
}

pub type Result<T> = std::result::Result<T, MachineError>;
