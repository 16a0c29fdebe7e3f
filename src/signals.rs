//! Ctrl-C / SIGTERM handling.

use anyhow::Result;

/// Install handlers that cancel running external commands on the first
/// SIGINT or SIGTERM. A second signal exits immediately.
#[cfg(unix)]
pub fn install_abort_handler() -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        let mut received = 0u32;
        for sig in signals.forever() {
            received += 1;
            if received > 1 {
                tracing::warn!("Received signal {} again, exiting", sig);
                std::process::exit(130);
            }
            tracing::warn!("Received signal {}, cancelling external commands", sig);
            mediaforged_av::abort_external_commands();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
pub fn install_abort_handler() -> Result<()> {
    Ok(())
}
