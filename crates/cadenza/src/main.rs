use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => args.run(),
        Command::Check(args) => args.run(),
    }
}

#[derive(Parser)]
#[command(name = "cadenza", about = "G-code motion controller")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a G-code program on the configured hardware boundary.
    Run(cli::run::RunArgs),
    /// Parse and validate a G-code program without moving anything.
    Check(cli::check::CheckArgs),
}
