//! One-time global `tracing` subscriber for test binaries (§4.13): library
//! crates never install a subscriber themselves, so any test that wants log
//! output calls [`init_tracing`] instead.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a `tracing_subscriber::fmt` subscriber filtered by `RUST_LOG`
/// (defaulting to `info`), once per test process. Safe to call from every
/// test that wants log output; later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_test_writer()
            .init();
    });
}
