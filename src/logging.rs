use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Path of the debug log, when set.
pub const DEBUG_ENV: &str = "TALLY_DEBUG";
/// Filter directives for stderr logging (defaults to `warn`).
pub const FILTER_ENV: &str = "TALLY_LOG";

/// Install the global subscriber.
///
/// With `TALLY_DEBUG=<path>` everything at debug level goes to that file;
/// otherwise warnings and errors go to stderr.
pub fn init() -> Result<()> {
    if let Some(path) = std::env::var_os(DEBUG_ENV) {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("failed to open debug log {:?}", path))?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("tally=debug"))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    } else {
        let filter =
            EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    }
    Ok(())
}
