//! Daemon main loop: socket intake thread plus a polling event loop.
//!
//! Architecture: two threads communicating over a bounded crossbeam channel.
//! - **Main thread**: polls signal flags and the event channel, hands each
//!   event to the [`ScanBroker`] sequentially. Events are never processed
//!   concurrently, so decisions observe a consistent prompt state.
//! - **Intake thread**: accepts connections on a Unix control socket and
//!   parses line-delimited JSON events.
//!
//! SIGUSR1 injects a scan-all event and SIGUSR2 a dismissal, so both work
//! without the socket.

use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::core::config::Config;
use crate::core::errors::{MsrError, Result};
use crate::core::paths::PathNormalizer;
use crate::daemon::broker::ScanBroker;
use crate::daemon::signals::SignalHandler;
use crate::dispatch::presenter::DesktopPromptPresenter;
use crate::dispatch::{CommandDispatcher, ScanDispatcher};
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::router::events::ScanEvent;
use crate::router::policy::ScanRequestRouter;
use crate::router::prompt::{PendingPromptTracker, PromptScheduler, ThreadScheduler};
use crate::settings::FilePreferenceStore;

/// Intake → main: bounded(64). A slow broker applies backpressure to socket
/// clients instead of buffering unboundedly.
const EVENT_CHANNEL_CAP: usize = 64;
/// Main loop poll interval; bounds signal latency.
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Accept-loop poll interval while waiting for connections.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Per-connection read timeout, so a stalled client cannot wedge intake.
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the router daemon until a shutdown signal arrives.
pub fn run(config: &Config) -> Result<()> {
    let mut broker = build_broker(config);
    let signals = SignalHandler::new();

    let listener = bind_control_socket(&config.paths.control_socket)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded::<ScanEvent>(EVENT_CHANNEL_CAP);
    let intake = spawn_intake(listener, tx, Arc::clone(&shutdown));

    broker.logger().write_entry(
        &LogEntry::new(EventType::DaemonStart, Severity::Info)
            .with_details(format!("socket {}", config.paths.control_socket.display())),
    );

    if config.router.emit_boot_event_on_start {
        broker.handle_event(&ScanEvent::BootCompleted);
    }

    let result = event_loop(&mut broker, &signals, &rx);

    shutdown.store(true, Ordering::Relaxed);
    if intake.join().is_err() {
        eprintln!("[MSR-SOCKET] intake thread panicked during shutdown");
    }
    let _ = std::fs::remove_file(&config.paths.control_socket);

    broker
        .logger()
        .write_entry(&LogEntry::new(EventType::DaemonStop, Severity::Info));
    broker.logger().flush();

    result
}

fn event_loop(
    broker: &mut ScanBroker,
    signals: &SignalHandler,
    rx: &Receiver<ScanEvent>,
) -> Result<()> {
    loop {
        if signals.should_shutdown() {
            return Ok(());
        }
        if signals.should_scan_all() {
            broker.handle_event(&ScanEvent::ScanAllRequested);
        }
        if signals.should_dismiss() {
            broker.handle_event(&ScanEvent::ScanDismissed);
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => broker.handle_event(&event),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                let e = MsrError::ChannelClosed {
                    component: "intake",
                };
                broker.logger().write_entry(
                    &LogEntry::new(EventType::Error, Severity::Critical)
                        .with_error(e.code(), e.to_string()),
                );
                return Err(e);
            }
        }
    }
}

fn build_broker(config: &Config) -> ScanBroker {
    let normalizer = PathNormalizer::new(
        &config.storage.external_root,
        &config.storage.legacy_root_alias,
    );
    let preferences =
        FilePreferenceStore::new(&config.preference.file, config.preference.default);
    let presenter = DesktopPromptPresenter::from_config(&config.prompt);
    let tracker = PendingPromptTracker::new(
        Arc::new(presenter),
        Arc::new(ThreadScheduler) as Arc<dyn PromptScheduler>,
    );
    let dispatcher =
        Arc::new(CommandDispatcher::new(&config.scanner.command)) as Arc<dyn ScanDispatcher>;
    let logger = JsonlWriter::open(&config.paths.jsonl_log);

    ScanBroker::new(
        ScanRequestRouter::new(normalizer),
        Box::new(preferences),
        config.preference.default,
        tracker,
        dispatcher,
        logger,
        config.router.cancel_grace_period(),
    )
}

fn bind_control_socket(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MsrError::io(parent, e))?;
    }
    // A socket file left behind by a previous run would make bind fail.
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
    let listener = UnixListener::bind(path).map_err(|e| MsrError::io(path, e))?;
    listener
        .set_nonblocking(true)
        .map_err(|e| MsrError::io(path, e))?;
    Ok(listener)
}

fn spawn_intake(
    listener: UnixListener,
    tx: Sender<ScanEvent>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("msr-intake".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => handle_client(stream, &tx, &shutdown),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                    Err(e) => {
                        eprintln!("[MSR-SOCKET] accept failed: {e}");
                        thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                }
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("[MSR-SOCKET] failed to spawn intake thread: {e}");
            // A daemon without intake still serves signal-driven events.
            thread::spawn(|| {})
        })
}

/// Read line-delimited JSON events from one connection. Malformed lines are
/// dropped with a stderr note rather than tearing down the connection.
fn handle_client(stream: UnixStream, tx: &Sender<ScanEvent>, shutdown: &AtomicBool) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT));

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let line = match line {
            Ok(l) => l,
            Err(_) => return,
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ScanEvent>(&line) {
            Ok(event) => {
                if tx.send(event).is_err() {
                    return;
                }
            }
            Err(e) => eprintln!("[MSR-SOCKET] dropping malformed event: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::TempDir;

    fn socket_path(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join("msr.sock")
    }

    #[test]
    fn bind_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        std::fs::write(&path, b"stale").unwrap();

        let listener = bind_control_socket(&path).unwrap();
        drop(listener);
        assert!(path.exists());
    }

    #[test]
    fn bind_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("nested").join("msr.sock");
        bind_control_socket(&path).unwrap();
    }

    #[test]
    fn intake_forwards_events_and_drops_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        let listener = bind_control_socket(&path).unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded::<ScanEvent>(8);
        let handle = spawn_intake(listener, tx, Arc::clone(&shutdown));

        let mut client = UnixStream::connect(&path).unwrap();
        writeln!(client, "{{\"type\":\"scan_all_requested\"}}").unwrap();
        writeln!(client, "not json at all").unwrap();
        writeln!(client, "{{\"type\":\"scan_dismissed\"}}").unwrap();
        drop(client);

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(first, ScanEvent::ScanAllRequested));
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(second, ScanEvent::ScanDismissed));

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn intake_stops_on_shutdown_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        let listener = bind_control_socket(&path).unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = bounded::<ScanEvent>(8);
        let handle = spawn_intake(listener, tx, Arc::clone(&shutdown));

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }
}
