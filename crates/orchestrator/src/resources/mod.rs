//! RAII resource guards for automatic cleanup.
//!
//! - [`RunGuard`] - Process-wide single-flight flag for demo runs
//! - [`RunLease`] - Releases the guard when the run ends, on every exit path

mod run_guard;

pub use run_guard::{RunGuard, RunLease};
