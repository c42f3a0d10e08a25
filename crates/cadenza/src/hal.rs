//! Concrete hardware boundaries, selected once from configuration.

use crate::config::HalConfig;
use anyhow::{Context, Result};
use cadenza_core::{HardwareBoundary, kinematics::delta::DeltaSolver};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

mod delta;
mod exporter;
mod virtual_boundary;

pub use delta::DeltaServoBoundary;
pub use exporter::FileExporter;
pub use virtual_boundary::VirtualBoundary;

/// Build the boundary named by `config`.
pub fn build(config: &HalConfig) -> Result<Box<dyn HardwareBoundary>> {
    let boundary: Box<dyn HardwareBoundary> = match config {
        HalConfig::Virtual => Box::new(VirtualBoundary::default()),
        HalConfig::Export { path } => Box::new(FileExporter::new(create(path)?)),
        HalConfig::Delta {
            geometry,
            scale,
            origin,
            output,
        } => {
            let solver = DeltaSolver::new(*geometry);
            let writer: Box<dyn Write> = match output {
                Some(path) => Box::new(create(path)?),
                None => Box::new(io::stdout()),
            };
            Box::new(DeltaServoBoundary::new(solver, *scale, *origin, writer))
        }
    };
    Ok(boundary)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("failed to create hal output {}", path.display()))?;
    Ok(BufWriter::new(file))
}
