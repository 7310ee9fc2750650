//! Signal handling: SIGTERM/SIGINT graceful shutdown, SIGUSR1 scan-all
//! trigger, and SIGUSR2 prompt dismissal.
//!
//! Uses the `signal-hook` crate for safe signal registration. The main loop
//! polls `SignalHandler` flags each iteration rather than blocking on signals.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Thread-safe signal state shared between the signal handler and the main loop.
///
/// All flags use `Ordering::Relaxed` because the main loop polls them every
/// iteration and exact ordering with other atomics is not required.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
    scan_all_flag: Arc<AtomicBool>,
    dismiss_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a new handler and register OS signal hooks.
    ///
    /// On Unix: SIGTERM/SIGINT -> shutdown, SIGUSR1 -> scan-all,
    /// SIGUSR2 -> dismiss prompt. Registration is best-effort; failures are
    /// logged to stderr but not fatal.
    #[must_use]
    pub fn new() -> Self {
        let handler = Self::unregistered();
        handler.register_signals();
        handler
    }

    fn unregistered() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            scan_all_flag: Arc::new(AtomicBool::new(false)),
            dismiss_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether a shutdown has been requested.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Check (and clear) whether a full scan has been requested.
    pub fn should_scan_all(&self) -> bool {
        self.scan_all_flag.swap(false, Ordering::Relaxed)
    }

    /// Check (and clear) whether a prompt dismissal has been requested.
    pub fn should_dismiss(&self) -> bool {
        self.dismiss_flag.swap(false, Ordering::Relaxed)
    }

    /// Programmatically request shutdown (e.g., from error escalation).
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    /// Programmatically request a full scan.
    pub fn request_scan_all(&self) {
        self.scan_all_flag.store(true, Ordering::Relaxed);
    }

    /// Programmatically request prompt dismissal.
    pub fn request_dismiss(&self) {
        self.dismiss_flag.store(true, Ordering::Relaxed);
    }

    fn register_signals(&self) {
        // SIGTERM / SIGINT -> shutdown
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[MSR-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[MSR-SIGNAL] failed to register SIGINT: {e}");
        }

        // SIGUSR1 -> scan all, SIGUSR2 -> dismiss (Unix only)
        #[cfg(unix)]
        {
            use signal_hook::consts::{SIGUSR1, SIGUSR2};
            if let Err(e) = signal_hook::flag::register(SIGUSR1, Arc::clone(&self.scan_all_flag)) {
                eprintln!("[MSR-SIGNAL] failed to register SIGUSR1: {e}");
            }
            if let Err(e) = signal_hook::flag::register(SIGUSR2, Arc::clone(&self.dismiss_flag)) {
                eprintln!("[MSR-SIGNAL] failed to register SIGUSR2: {e}");
            }
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
