//! Collaborator interfaces for executing routed actions: the external
//! scanning service and the consent-prompt presenter.

pub mod presenter;

use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::Mutex;

use crate::router::events::Volume;

/// Requests scans from the external scanning service.
///
/// Fire-and-forget: the router never observes a return value, and dispatch
/// failures are swallowed after a stderr note.
pub trait ScanDispatcher: Send + Sync {
    /// Request a full scan of one volume.
    fn request_volume_scan(&self, volume: Volume);
    /// Request a scan of a single normalized file path.
    fn request_file_scan(&self, path: &Path);
}

/// Spawns the configured scanner service binary per request.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    command: PathBuf,
}

impl CommandDispatcher {
    /// Dispatch by spawning `command` with `--volume <id>` / `--file <path>`.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn spawn(&self, args: &[&std::ffi::OsStr]) {
        if let Err(e) = Command::new(&self.command).args(args).spawn() {
            eprintln!(
                "[MSR-DISPATCH] failed to invoke scanner {}: {e}",
                self.command.display()
            );
        }
    }
}

impl ScanDispatcher for CommandDispatcher {
    fn request_volume_scan(&self, volume: Volume) {
        let volume = volume.to_string();
        self.spawn(&["--volume".as_ref(), volume.as_ref()]);
    }

    fn request_file_scan(&self, path: &Path) {
        self.spawn(&["--file".as_ref(), path.as_os_str()]);
    }
}

/// A single captured scan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRequest {
    /// Full-volume scan.
    Volume(Volume),
    /// Single-file scan.
    File(PathBuf),
}

/// Captures requests instead of dispatching them. Used by tests and by the
/// `decide` CLI command, which must not invoke a real scanner.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    requests: Mutex<Vec<ScanRequest>>,
}

impl RecordingDispatcher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of requests captured so far, in dispatch order.
    pub fn requests(&self) -> Vec<ScanRequest> {
        self.requests.lock().clone()
    }
}

impl ScanDispatcher for RecordingDispatcher {
    fn request_volume_scan(&self, volume: Volume) {
        self.requests.lock().push(ScanRequest::Volume(volume));
    }

    fn request_file_scan(&self, path: &Path) {
        self.requests
            .lock()
            .push(ScanRequest::File(path.to_path_buf()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_preserves_order() {
        let d = RecordingDispatcher::new();
        d.request_volume_scan(Volume::Internal);
        d.request_file_scan(Path::new("/media/a.mp3"));
        d.request_volume_scan(Volume::External);

        assert_eq!(
            d.requests(),
            vec![
                ScanRequest::Volume(Volume::Internal),
                ScanRequest::File(PathBuf::from("/media/a.mp3")),
                ScanRequest::Volume(Volume::External),
            ]
        );
    }

    #[test]
    fn command_dispatcher_swallows_spawn_failure() {
        // A nonexistent binary must not panic or propagate.
        let d = CommandDispatcher::new("/no/such/scanner-binary");
        d.request_volume_scan(Volume::External);
        d.request_file_scan(Path::new("/media/a.mp3"));
    }
}
