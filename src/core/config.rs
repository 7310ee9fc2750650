//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{MsrError, Result};
use crate::settings::BootScanPreference;

/// Full router configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub router: RouterConfig,
    pub storage: StorageConfig,
    pub preference: PreferenceConfig,
    pub scanner: ScannerConfig,
    pub prompt: PromptConfig,
    pub paths: PathsConfig,
}

/// Routing behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    /// Grace period before a scheduled prompt cancellation actually fires.
    ///
    /// Exists to avoid racing a scan triggered by the same mount sequence
    /// that produced the boot event.
    pub cancel_grace_period_secs: u64,
    /// Emit a `BootCompleted` event when the daemon starts.
    pub emit_boot_event_on_start: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cancel_grace_period_secs: 120,
            emit_boot_event_on_start: true,
        }
    }
}

impl RouterConfig {
    /// The cancel grace period as a [`Duration`].
    #[must_use]
    pub const fn cancel_grace_period(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_period_secs)
    }
}

/// Storage roots used for path normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Canonical external storage root; file-changed events must resolve
    /// under this root to trigger a single-file scan.
    pub external_root: PathBuf,
    /// Historical mount location still referenced by pre-migration installs.
    pub legacy_root_alias: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            external_root: PathBuf::from("/media"),
            legacy_root_alias: PathBuf::from("/mnt/media"),
        }
    }
}

/// Boot-scan preference store location and fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreferenceConfig {
    /// File holding the persisted tri-state preference.
    pub file: PathBuf,
    /// Value used when the file is absent or unreadable.
    pub default: BootScanPreference,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            file: data_dir().join("boot-scan-preference"),
            default: BootScanPreference::Enabled,
        }
    }
}

/// External scanning-service invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Scanner service binary; invoked fire-and-forget with
    /// `--volume <id>` or `--file <path>`.
    pub command: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("media-scanner"),
        }
    }
}

/// Consent-prompt presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    /// Marker file standing in for the prompt registration. It outlives the
    /// process, so prompt existence survives a daemon restart.
    pub marker_file: PathBuf,
    /// Whether to raise a desktop notification alongside the registration.
    pub desktop: bool,
    pub title: String,
    pub body: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            marker_file: data_dir().join("scan-prompt.pending"),
            desktop: true,
            title: "Scan media library?".to_string(),
            body: "New storage was detected. Run a full media scan now?".to_string(),
        }
    }
}

/// Filesystem paths used by msr itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
    /// Unix socket where the daemon accepts line-delimited JSON events.
    pub control_socket: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            config_file: home.join(".config").join("msr").join("config.toml"),
            jsonl_log: data_dir().join("activity.jsonl"),
            control_socket: data_dir().join("control.sock"),
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[MSR-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("msr")
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from the default or an explicit path, then apply env
    /// overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .map_err(|source| MsrError::io(&path_buf, source))?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(MsrError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // router
        set_env_u64(
            "MSR_ROUTER_CANCEL_GRACE_PERIOD_SECS",
            &mut self.router.cancel_grace_period_secs,
        )?;
        set_env_bool(
            "MSR_ROUTER_EMIT_BOOT_EVENT_ON_START",
            &mut self.router.emit_boot_event_on_start,
        )?;

        // storage
        set_env_path("MSR_STORAGE_EXTERNAL_ROOT", &mut self.storage.external_root);
        set_env_path(
            "MSR_STORAGE_LEGACY_ROOT_ALIAS",
            &mut self.storage.legacy_root_alias,
        );

        // preference
        set_env_path("MSR_PREFERENCE_FILE", &mut self.preference.file);

        // scanner
        set_env_path("MSR_SCANNER_COMMAND", &mut self.scanner.command);

        // prompt
        set_env_path("MSR_PROMPT_MARKER_FILE", &mut self.prompt.marker_file);
        set_env_bool("MSR_PROMPT_DESKTOP", &mut self.prompt.desktop)?;

        // paths
        set_env_path("MSR_PATHS_JSONL_LOG", &mut self.paths.jsonl_log);
        set_env_path("MSR_PATHS_CONTROL_SOCKET", &mut self.paths.control_socket);

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.storage.external_root.is_absolute() {
            return Err(MsrError::InvalidConfig {
                details: format!(
                    "storage.external_root must be absolute, got {}",
                    self.storage.external_root.display()
                ),
            });
        }
        if !self.storage.legacy_root_alias.is_absolute() {
            return Err(MsrError::InvalidConfig {
                details: format!(
                    "storage.legacy_root_alias must be absolute, got {}",
                    self.storage.legacy_root_alias.display()
                ),
            });
        }
        if self.storage.external_root == self.storage.legacy_root_alias {
            return Err(MsrError::InvalidConfig {
                details: "storage.external_root and storage.legacy_root_alias must differ"
                    .to_string(),
            });
        }
        if self.scanner.command.as_os_str().is_empty() {
            return Err(MsrError::InvalidConfig {
                details: "scanner.command must not be empty".to_string(),
            });
        }
        if self.prompt.marker_file.as_os_str().is_empty() {
            return Err(MsrError::InvalidConfig {
                details: "prompt.marker_file must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_u64(name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u64>().map_err(|error| MsrError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_bool(name: &str, slot: &mut bool) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<bool>().map_err(|error| MsrError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_path(name: &str, slot: &mut PathBuf) {
    if let Some(raw) = env_var(name) {
        *slot = PathBuf::from(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_grace_period_is_two_minutes() {
        let cfg = Config::default();
        assert_eq!(
            cfg.router.cancel_grace_period(),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn relative_external_root_is_rejected() {
        let mut cfg = Config::default();
        cfg.storage.external_root = PathBuf::from("media");
        let err = cfg.validate().expect_err("expected invalid root");
        assert_eq!(err.code(), "MSR-1001");
    }

    #[test]
    fn identical_roots_are_rejected() {
        let mut cfg = Config::default();
        cfg.storage.legacy_root_alias.clone_from(&cfg.storage.external_root);
        let err = cfg.validate().expect_err("expected invalid roots");
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn empty_scanner_command_is_rejected() {
        let mut cfg = Config::default();
        cfg.scanner.command = PathBuf::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert_eq!(err.code(), "MSR-1002");
    }

    #[test]
    fn load_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[router]
cancel_grace_period_secs = 5

[storage]
external_root = "/srv/media"
legacy_root_alias = "/srv/old-media"
"#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.router.cancel_grace_period_secs, 5);
        assert_eq!(cfg.storage.external_root, PathBuf::from("/srv/media"));
        assert_eq!(cfg.paths.config_file, path);
        // Untouched sections keep defaults.
        assert!(cfg.router.emit_boot_event_on_start);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "= not toml").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code(), "MSR-1003");
    }

    #[test]
    fn config_roundtrip_toml() {
        let cfg = Config::default();
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(cfg, parsed);
    }
}
