//! Motion control kernel shared across Cadenza components.
//!
//! This crate performs no I/O of its own; all hardware access goes
//! through an injected [`hal::HardwareBoundary`].

pub mod command;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod hal;
pub mod kinematics;
pub mod machine;
pub mod trajectory;

pub use command::{Code, Command};
pub use config::MachineConfig;
pub use coordinates::{Axis, AxisFlags, Coordinates};
pub use error::{ErrorKind, MachineError, Result};
pub use hal::HardwareBoundary;
pub use machine::{MachineController, MachineState};
pub use trajectory::{MotionEvent, Trajectory};
