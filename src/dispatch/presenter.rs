//! Consent-prompt presentation.
//!
//! The prompt registration is durable state held outside the router: a
//! marker file that outlives the process, so "does a prompt exist" survives
//! a daemon restart. The desktop notification itself is fire-and-forget and
//! best-effort; its failure never propagates.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::core::config::PromptConfig;

/// Presents the consent prompt and tracks its durable registration.
pub trait PromptPresenter: Send + Sync {
    /// Whether a prompt registration currently exists.
    fn exists(&self) -> bool;
    /// Register the prompt and raise the notification.
    fn show(&self);
    /// Remove the registration and retract the notification. Best-effort:
    /// a registration that no longer exists is not an error.
    fn cancel(&self);
}

/// Marker-file registration plus an optional `notify-send` desktop
/// notification.
#[derive(Debug)]
pub struct DesktopPromptPresenter {
    marker_file: PathBuf,
    desktop: bool,
    title: String,
    body: String,
}

impl DesktopPromptPresenter {
    /// Build a presenter from configuration.
    #[must_use]
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            marker_file: config.marker_file.clone(),
            desktop: config.desktop,
            title: config.title.clone(),
            body: config.body.clone(),
        }
    }

    fn raise_desktop_notification(&self) {
        #[cfg(target_os = "linux")]
        {
            let _ = Command::new("notify-send")
                .arg("--urgency")
                .arg("normal")
                .arg("--app-name=msr")
                .arg(&self.title)
                .arg(&self.body)
                .spawn();
        }

        #[cfg(target_os = "macos")]
        {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                self.body.replace('"', "\\\""),
                self.title.replace('"', "\\\"")
            );
            let _ = Command::new("osascript").arg("-e").arg(&script).spawn();
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let _ = (&self.title, &self.body);
        }
    }
}

impl PromptPresenter for DesktopPromptPresenter {
    fn exists(&self) -> bool {
        self.marker_file.exists()
    }

    fn show(&self) {
        if let Some(parent) = self.marker_file.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let created = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.marker_file);
        if created.is_err() {
            eprintln!(
                "[MSR-PROMPT] could not register prompt marker at {}",
                self.marker_file.display()
            );
            return;
        }
        if self.desktop {
            self.raise_desktop_notification();
        }
    }

    fn cancel(&self) {
        // Removing an already-absent marker is the expected idempotent case.
        let _ = fs::remove_file(&self.marker_file);
    }
}

/// In-process presenter for tests and one-shot CLI decisions: an atomic flag
/// plus call counters.
#[derive(Debug, Default)]
pub struct InMemoryPromptPresenter {
    active: AtomicBool,
    shows: AtomicUsize,
    cancels: AtomicUsize,
}

impl InMemoryPromptPresenter {
    /// Create an inactive presenter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a presenter with the registration already active, as after a
    /// restart with a surviving marker.
    #[must_use]
    pub fn already_active() -> Self {
        let presenter = Self::default();
        presenter.active.store(true, Ordering::SeqCst);
        presenter
    }

    /// Number of `show` calls observed.
    pub fn show_count(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    /// Number of `cancel` calls observed.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl PromptPresenter for InMemoryPromptPresenter {
    fn exists(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }
}
