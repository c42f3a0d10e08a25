use anyhow::{Context, Result};
use cadenza_core::{HardwareBoundary, MachineController};
use tracing::{debug, error};

/// Outcome of a program that ran to completion.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProgramReport {
    /// Statements executed, comment-only lines included
    pub executed: usize,
    /// Responses in program order (M114)
    pub responses: Vec<String>,
}

/// Parse `source` and execute it statement by statement.
///
/// Execution stops at the first failing line; the error names that line
/// and still downcasts to the underlying
/// [`MachineError`](cadenza_core::MachineError).
pub fn run_program<H: HardwareBoundary>(
    controller: &mut MachineController<H>,
    source: &str,
) -> Result<ProgramReport> {
    let statements = cadenza_gcode::parse(source).context("failed to parse program")?;
    let mut report = ProgramReport::default();

    for statement in &statements {
        if !statement.checksum_matches() {
            anyhow::bail!("line {}: checksum mismatch", statement.line);
        }
        debug!(line = statement.line, "{}", statement.raw.trim());

        let response = controller
            .execute(statement)
            .with_context(|| format!("line {}: {}", statement.line, statement.raw.trim()))?;
        report.executed += 1;
        report.responses.extend(response);
    }

    Ok(report)
}

/// Release the hardware after a run and settle on one result.
///
/// A program failure wins over a release failure, which is then only
/// logged.
pub fn release_after<H: HardwareBoundary>(
    controller: MachineController<H>,
    outcome: Result<ProgramReport>,
) -> Result<ProgramReport> {
    let released = controller.release();
    match (outcome, released) {
        (Ok(report), Ok(_)) => Ok(report),
        (Ok(_), Err(err)) => Err(err).context("failed to release hardware"),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(release_err)) => {
            error!("failed to release hardware: {release_err}");
            Err(err)
        }
    }
}
