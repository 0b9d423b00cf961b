use anyhow::Context;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Install the stop flag for a run.
///
/// The first Ctrl-C or SIGTERM sets the flag so the current product winds
/// down at its next step boundary and its browser is closed. A second
/// Ctrl-C while the flag is set exits immediately.
pub fn install() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    // Order matters: the conditional shutdown must see the flag before the
    // plain registration sets it.
    flag::register_conditional_shutdown(SIGINT, 1, Arc::clone(&stop))
        .context("failed to register SIGINT shutdown handler")?;
    flag::register(SIGINT, Arc::clone(&stop)).context("failed to register SIGINT handler")?;
    flag::register(SIGTERM, Arc::clone(&stop)).context("failed to register SIGTERM handler")?;
    Ok(stop)
}
