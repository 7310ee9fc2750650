//! The routing decision core: given an inbound event, the persisted boot-scan
//! preference, and whether a consent prompt is outstanding, decide which scan
//! actions to take.
//!
//! `decide` is total — it never fails. The only error source is path
//! normalization, and a normalization failure converts the event into a
//! logged no-op rather than propagating.

use crate::core::errors::MsrError;
use crate::core::paths::PathNormalizer;
use crate::router::events::{ScanAction, ScanEvent, Volume};
use crate::settings::BootScanPreference;

/// Outcome of routing one event.
#[derive(Debug)]
pub struct Decision {
    /// Actions to execute, in order. Never empty — a suppressed or dropped
    /// event yields `[NoOp]`.
    pub actions: Vec<ScanAction>,
    /// Set when a path event was dropped because normalization failed.
    pub drop_reason: Option<MsrError>,
}

impl Decision {
    fn act(actions: Vec<ScanAction>) -> Self {
        Self {
            actions,
            drop_reason: None,
        }
    }

    fn noop() -> Self {
        Self::act(vec![ScanAction::NoOp])
    }

    fn dropped(reason: MsrError) -> Self {
        Self {
            actions: vec![ScanAction::NoOp],
            drop_reason: Some(reason),
        }
    }
}

/// The scan request router.
#[derive(Debug)]
pub struct ScanRequestRouter {
    normalizer: PathNormalizer,
}

impl ScanRequestRouter {
    /// Create a router normalizing against the given storage roots.
    #[must_use]
    pub const fn new(normalizer: PathNormalizer) -> Self {
        Self { normalizer }
    }

    /// The normalizer this router decides against.
    #[must_use]
    pub const fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Route one event.
    ///
    /// Prompt suppression applies only to mount/file events; the three
    /// explicit scan-control events act regardless of prompt state. While a
    /// prompt is outstanding, mount/file events are suppressed before any
    /// path work happens, so even malformed paths yield a clean `NoOp`.
    #[must_use]
    pub fn decide(
        &self,
        event: &ScanEvent,
        preference: BootScanPreference,
        prompt_active: bool,
    ) -> Decision {
        match event {
            ScanEvent::BootCompleted => match preference {
                BootScanPreference::Enabled => Decision::act(vec![
                    ScanAction::ScanVolume {
                        volume: Volume::Internal,
                    },
                    ScanAction::ScanVolume {
                        volume: Volume::External,
                    },
                ]),
                BootScanPreference::Ask => Decision::act(vec![ScanAction::ShowPrompt]),
                BootScanPreference::Disabled => Decision::act(vec![ScanAction::CancelPrompt]),
            },
            ScanEvent::ScanAllRequested => Decision::act(vec![
                ScanAction::CancelPrompt,
                ScanAction::ScanVolume {
                    volume: Volume::Internal,
                },
                ScanAction::ScanVolume {
                    volume: Volume::External,
                },
            ]),
            ScanEvent::ScanDismissed => Decision::act(vec![ScanAction::CancelPrompt]),
            ScanEvent::VolumeMounted { path } => {
                if prompt_active {
                    return Decision::noop();
                }
                match self.normalizer.canonicalize(path) {
                    Ok(_) => Decision::act(vec![ScanAction::ScanVolume {
                        volume: Volume::External,
                    }]),
                    Err(e) => Decision::dropped(e),
                }
            }
            ScanEvent::FileChanged { path } => {
                if prompt_active {
                    return Decision::noop();
                }
                match self.normalizer.canonicalize(path) {
                    Ok(normalized) if self.normalizer.is_under_external_root(&normalized) => {
                        Decision::act(vec![ScanAction::ScanFile { path: normalized }])
                    }
                    Ok(_) => Decision::noop(),
                    Err(e) => Decision::dropped(e),
                }
            }
        }
    }
}
