use anyhow::{Context, Result};
use cadenza::{Config, hal, logging, release_after, run_program};
use cadenza_core::MachineController;
use clap::Args;
use std::{fs, path::PathBuf};

#[derive(Args)]
pub struct RunArgs {
    /// Path to the configuration file (TOML or JSON).
    pub config: PathBuf,

    /// G-code program to execute.
    pub program: PathBuf,

    /// Start with debug logging, as if the program began with M111.
    #[arg(long)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn run(&self) -> Result<()> {
        let log = logging::init()?;
        if self.verbose {
            log.set_verbose(true)?;
        }

        let config = Config::from_file(&self.config)?;
        config.validate()?;
        let program = fs::read_to_string(&self.program)
            .with_context(|| format!("failed to read program {}", self.program.display()))?;

        tracing::info!("Starting cadenza with config: {}", self.config.display());

        let boundary = hal::build(&config.hal)?;
        let mut controller = MachineController::new(config.machine, boundary)?;
        controller.set_diagnostics_hook(log.diagnostics_hook());

        let outcome = run_program(&mut controller, &program);
        let report = release_after(controller, outcome)?;

        for response in &report.responses {
            println!("{response}");
        }
        tracing::info!(statements = report.executed, "program finished");
        Ok(())
    }
}
