//! Event and action model for the scan request router.
//!
//! `ScanEvent` is the inbound trigger (delivered over the control socket or
//! synthesized by the daemon); `ScanAction` is what the router decides to do.
//! Both are transient values, constructed fresh per delivery and never
//! persisted.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A logical storage area subject to media scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volume {
    /// The indexer's built-in library storage.
    Internal,
    /// Removable / external storage under the external root.
    External,
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::External => write!(f, "external"),
        }
    }
}

/// Inbound trigger delivered to the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// System startup finished.
    BootCompleted,
    /// Explicit request to scan everything (e.g. the user accepted the
    /// consent prompt).
    ScanAllRequested,
    /// The user dismissed the consent prompt.
    ScanDismissed,
    /// A storage volume was mounted at `path`.
    VolumeMounted { path: PathBuf },
    /// A single file changed at `path`.
    FileChanged { path: PathBuf },
}

impl ScanEvent {
    /// Stable label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BootCompleted => "boot_completed",
            Self::ScanAllRequested => "scan_all_requested",
            Self::ScanDismissed => "scan_dismissed",
            Self::VolumeMounted { .. } => "volume_mounted",
            Self::FileChanged { .. } => "file_changed",
        }
    }
}

/// Action the router decided on. Produced and consumed synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScanAction {
    /// Ask the scanning service for a full scan of one volume.
    ScanVolume { volume: Volume },
    /// Ask the scanning service to scan a single (already normalized) file.
    ScanFile { path: PathBuf },
    /// Show the consent prompt.
    ShowPrompt,
    /// Schedule cancellation of the outstanding prompt registration after
    /// the configured grace period.
    CancelPrompt,
    /// Take no action.
    NoOp,
}

impl fmt::Display for ScanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanVolume { volume } => write!(f, "scan_volume({volume})"),
            Self::ScanFile { path } => write!(f, "scan_file({})", path.display()),
            Self::ShowPrompt => write!(f, "show_prompt"),
            Self::CancelPrompt => write!(f, "cancel_prompt"),
            Self::NoOp => write!(f, "no_op"),
        }
    }
}
