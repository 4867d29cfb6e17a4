//! # Tracing Setup
//!
//! The framework logs through `tracing` with structured fields (`actor`,
//! `mailbox`, `request_id`, `kind`, `error`). Nothing is printed until a
//! subscriber is installed.

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// - `RUST_LOG=info` - actor activation and pool lifecycle
/// - `RUST_LOG=debug` - request failures and worker start/stop
/// - `RUST_LOG=trace` - every send, buffer and dispatch cycle
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`] but returns `false` instead of panicking when a
/// subscriber is already installed. Handy in tests, where every test may try.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_test_writer()
        .try_init()
        .is_ok()
}
