//! Persisted boot-scan preference: the tri-state controlling whether a full
//! media scan runs automatically after startup.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{MsrError, Result};

/// What to do about a full scan when the system boots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootScanPreference {
    /// Scan internal and external volumes unconditionally.
    Enabled,
    /// Ask the user for consent via a prompt.
    Ask,
    /// Never scan on boot.
    Disabled,
}

impl Default for BootScanPreference {
    fn default() -> Self {
        Self::Enabled
    }
}

impl fmt::Display for BootScanPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Ask => write!(f, "ask"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for BootScanPreference {
    type Err = MsrError;

    /// Accepts the lowercase names and the legacy numeric encoding
    /// (`0`/`1`/`2`) written by pre-migration settings stores.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "0" => Ok(Self::Enabled),
            "ask" | "1" => Ok(Self::Ask),
            "disabled" | "2" => Ok(Self::Disabled),
            _ => Err(MsrError::PreferenceParse { raw: s.to_string() }),
        }
    }
}

/// Read-only access to the persisted boot-scan preference.
///
/// The store is consulted fresh on every boot event; implementations must not
/// cache across reads.
pub trait PreferenceStore: Send + Sync {
    /// Read the current preference.
    fn read(&self) -> Result<BootScanPreference>;
}

/// File-backed store: a single-value file holding the preference.
///
/// An absent file yields the configured default (a fresh install has no
/// stored preference). Unparseable contents are an error so the caller can
/// log before falling back.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
    default: BootScanPreference,
}

impl FilePreferenceStore {
    /// Create a store reading from `path`, with `default` used when the file
    /// does not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, default: BootScanPreference) -> Self {
        Self {
            path: path.into(),
            default,
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn read(&self) -> Result<BootScanPreference> {
        if !self.path.exists() {
            return Ok(self.default);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| MsrError::io(&self.path, e))?;
        raw.parse()
    }
}

/// Fixed-value store for tests and one-shot CLI decisions.
#[derive(Debug, Clone, Copy)]
pub struct InMemoryPreferenceStore {
    value: BootScanPreference,
}

impl InMemoryPreferenceStore {
    /// Create a store that always returns `value`.
    #[must_use]
    pub const fn new(value: BootScanPreference) -> Self {
        Self { value }
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn read(&self) -> Result<BootScanPreference> {
        Ok(self.value)
    }
}
