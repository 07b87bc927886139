//! Deterministic simulation harness for dlock testing.
//!
//! Turmoil-based [`Transport`](dlock_core::Transport) implementation and a
//! scripted fake lock server, so client behaviour can be tested against exact
//! server replies on virtual time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_server;
pub mod sim_transport;

pub use sim_server::{ServerLog, ServerScript, run_sim_server, serve_connection};
pub use sim_transport::SimTransport;

/// Install a test-friendly tracing subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
