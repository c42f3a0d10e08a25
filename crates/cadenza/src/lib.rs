//! Process side of Cadenza: configuration loading, logging setup,
//! hardware boundary selection and the program runner.

pub mod config;
pub mod hal;
pub mod logging;
pub mod runner;

pub use config::{Config, HalConfig};
pub use runner::{ProgramReport, release_after, run_program};
