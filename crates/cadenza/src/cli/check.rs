use anyhow::Result;
use cadenza_core::Command;
use clap::Args;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Args)]
pub struct CheckArgs {
    /// G-code files to check.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        let mut failed = 0usize;
        for path in &self.files {
            match check_file(path) {
                Ok(count) => println!("OK {} ({count} commands)", path.display()),
                Err(err) => {
                    println!("ERR {}: {err:#}", path.display());
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{failed} of {} files failed", self.files.len());
        }
        Ok(())
    }
}

/// Parse a file and convert every line into a command.
fn check_file(path: &Path) -> Result<usize> {
    let input = fs::read_to_string(path)?;
    let mut count = 0;
    for statement in cadenza_gcode::parse(&input)? {
        if !statement.checksum_matches() {
            anyhow::bail!("line {}: checksum mismatch", statement.line);
        }
        if Command::from_statement(&statement)?.is_some() {
            count += 1;
        }
    }
    Ok(count)
}
