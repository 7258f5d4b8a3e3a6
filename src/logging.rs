//! Log output setup.
//!
//! Library code only emits `tracing` events; binaries call [`init`] once at
//! startup to print them.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Output goes to stderr: stdout may be the delivery relay, and a stray log
/// line there would corrupt the frame stream. The level comes from
/// `RUST_LOG`, defaulting to `info`. Calling this more than once is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
