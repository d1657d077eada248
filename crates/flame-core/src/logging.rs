//! Tracing subscriber wiring shared by demo binaries and tests.

/// Install a `tracing` subscriber reading filter directives from
/// `RUST_LOG`, defaulting to `info` when unset.
///
/// Safe to call more than once; later calls are no-ops if a global
/// subscriber is already installed.
#[cfg(feature = "init")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
