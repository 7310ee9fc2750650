//! Event execution: wires the router's decisions to the dispatcher, the
//! prompt tracker, and the activity log.
//!
//! Each event is handled to completion before the next one; the only
//! asynchronous element is the delayed prompt cancellation owned by the
//! tracker's scheduler.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::ScanDispatcher;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::router::events::{ScanAction, ScanEvent};
use crate::router::policy::ScanRequestRouter;
use crate::router::prompt::PendingPromptTracker;
use crate::settings::{BootScanPreference, PreferenceStore};

/// Executes routing decisions for inbound events.
pub struct ScanBroker {
    router: ScanRequestRouter,
    preferences: Box<dyn PreferenceStore>,
    default_preference: BootScanPreference,
    tracker: PendingPromptTracker,
    dispatcher: Arc<dyn ScanDispatcher>,
    logger: JsonlWriter,
    cancel_grace_period: Duration,
}

impl ScanBroker {
    /// Assemble a broker from its collaborators.
    #[must_use]
    pub fn new(
        router: ScanRequestRouter,
        preferences: Box<dyn PreferenceStore>,
        default_preference: BootScanPreference,
        tracker: PendingPromptTracker,
        dispatcher: Arc<dyn ScanDispatcher>,
        logger: JsonlWriter,
        cancel_grace_period: Duration,
    ) -> Self {
        Self {
            router,
            preferences,
            default_preference,
            tracker,
            dispatcher,
            logger,
            cancel_grace_period,
        }
    }

    /// The prompt tracker, for status queries.
    #[must_use]
    pub const fn tracker(&self) -> &PendingPromptTracker {
        &self.tracker
    }

    /// Access to the activity log, for daemon lifecycle entries.
    pub fn logger(&mut self) -> &mut JsonlWriter {
        &mut self.logger
    }

    /// Handle one event to completion.
    pub fn handle_event(&mut self, event: &ScanEvent) {
        // The preference only steers the boot row; it is re-read fresh for
        // every boot event rather than cached.
        let preference = if matches!(event, ScanEvent::BootCompleted) {
            self.read_preference()
        } else {
            self.default_preference
        };

        let prompt_active = self.tracker.exists();
        let decision = self.router.decide(event, preference, prompt_active);

        if matches!(event, ScanEvent::BootCompleted) {
            self.logger.write_entry(
                &LogEntry::new(EventType::BootRouted, Severity::Info)
                    .with_trigger(event.kind())
                    .with_preference(preference),
            );
        }

        if let Some(reason) = &decision.drop_reason {
            self.logger.write_entry(
                &LogEntry::new(EventType::EventDropped, Severity::Warning)
                    .with_trigger(event.kind())
                    .with_error(reason.code(), reason.to_string()),
            );
        }

        for action in &decision.actions {
            self.execute(event, action, decision.drop_reason.is_some());
        }
    }

    fn execute(&mut self, event: &ScanEvent, action: &ScanAction, dropped: bool) {
        match action {
            ScanAction::ScanVolume { volume } => {
                self.dispatcher.request_volume_scan(*volume);
                self.logger.write_entry(
                    &LogEntry::new(EventType::VolumeScanRequested, Severity::Info)
                        .with_trigger(event.kind())
                        .with_volume(volume),
                );
            }
            ScanAction::ScanFile { path } => {
                self.dispatcher.request_file_scan(path);
                self.logger.write_entry(
                    &LogEntry::new(EventType::FileScanRequested, Severity::Info)
                        .with_trigger(event.kind())
                        .with_path(path),
                );
            }
            ScanAction::ShowPrompt => {
                if self.tracker.show() {
                    self.logger.write_entry(
                        &LogEntry::new(EventType::PromptShown, Severity::Info)
                            .with_trigger(event.kind()),
                    );
                } else {
                    self.logger.write_entry(
                        &LogEntry::new(EventType::EventSuppressed, Severity::Info)
                            .with_trigger(event.kind())
                            .with_details("prompt already registered"),
                    );
                }
            }
            ScanAction::CancelPrompt => {
                self.tracker.cancel_after(self.cancel_grace_period);
                self.logger.write_entry(
                    &LogEntry::new(EventType::PromptCancelScheduled, Severity::Info)
                        .with_trigger(event.kind())
                        .with_details(format!(
                            "grace period {}s",
                            self.cancel_grace_period.as_secs()
                        )),
                );
            }
            ScanAction::NoOp => {
                // Dropped events already produced an EventDropped entry.
                if !dropped {
                    self.logger.write_entry(
                        &LogEntry::new(EventType::EventSuppressed, Severity::Info)
                            .with_trigger(event.kind()),
                    );
                }
            }
        }
    }

    fn read_preference(&mut self) -> BootScanPreference {
        match self.preferences.read() {
            Ok(preference) => preference,
            Err(e) => {
                self.logger.write_entry(
                    &LogEntry::new(EventType::Error, Severity::Warning)
                        .with_error(e.code(), e.to_string())
                        .with_details(format!(
                            "falling back to default preference {}",
                            self.default_preference
                        )),
                );
                self.default_preference
            }
        }
    }
}

impl std::fmt::Debug for ScanBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanBroker")
            .field("router", &self.router)
            .field("cancel_grace_period", &self.cancel_grace_period)
            .finish_non_exhaustive()
    }
}
