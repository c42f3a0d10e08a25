//! Tracing subscriber setup.
//!
//! The filter sits behind a reload layer so a running program can turn
//! on debug output (M111) without restarting the process.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const DEFAULT_FILTER: &str = "info";
const VERBOSE_FILTER: &str = "debug";

/// Handle to the installed log filter.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

/// Install the global subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init() -> Result<LogHandle> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LogHandle { filter: handle })
}

impl LogHandle {
    pub fn set_verbose(&self, verbose: bool) -> Result<()> {
        let directive = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
        self.filter
            .reload(EnvFilter::new(directive))
            .context("failed to reload log filter")
    }

    /// Callback for [`cadenza_core::MachineController::set_diagnostics_hook`].
    pub fn diagnostics_hook(&self) -> impl FnMut(bool) + 'static {
        let handle = self.clone();
        move |verbose| {
            if let Err(err) = handle.set_verbose(verbose) {
                tracing::warn!("{err:#}");
            }
        }
    }
}
