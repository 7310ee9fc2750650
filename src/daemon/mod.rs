//! Daemon subsystem: event broker, main loop with socket intake, and signal
//! handling.

pub mod broker;
#[cfg(all(unix, feature = "daemon"))]
pub mod loop_main;
#[cfg(feature = "daemon")]
pub mod signals;
