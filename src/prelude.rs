//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use media_scan_router::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{MsrError, Result};
pub use crate::core::paths::PathNormalizer;

// Events and routing
pub use crate::router::events::{ScanAction, ScanEvent, Volume};
pub use crate::router::policy::{Decision, ScanRequestRouter};
pub use crate::router::prompt::{
    ManualScheduler, PendingPromptTracker, PromptScheduler, ThreadScheduler,
};

// Settings
pub use crate::settings::{
    BootScanPreference, FilePreferenceStore, InMemoryPreferenceStore, PreferenceStore,
};

// Dispatch
pub use crate::dispatch::presenter::{
    DesktopPromptPresenter, InMemoryPromptPresenter, PromptPresenter,
};
pub use crate::dispatch::{CommandDispatcher, RecordingDispatcher, ScanDispatcher, ScanRequest};

// Execution
pub use crate::daemon::broker::ScanBroker;
pub use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
